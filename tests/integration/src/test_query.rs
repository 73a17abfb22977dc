//! Queries over a populated table: prefixes, ranges, paging, indexes.

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use monotable_core::{
        ConditionExpressionBuilder, QueryRequest, ScanDirection, TableSchema, Value,
    };

    use crate::{MemoryTable, workorder_model, workorder_table};

    /// Org 1 gets workorders 1..=5, org 2 gets workorders 1..=2.
    fn populated() -> (TableSchema, MemoryTable) {
        let model = workorder_model();
        let schema = workorder_table();
        let mut table = MemoryTable::new(schema.clone());
        let builder = ConditionExpressionBuilder::new(&schema);
        let created = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        for (org, count) in [(1, 5), (2, 2)] {
            for wo in 1..=count {
                let item = model
                    .create([
                        ("org_id", Value::from(org)),
                        ("workorder_id", Value::from(wo)),
                        ("date_created", Value::from(created)),
                        ("task_id", Value::from(format!("task-{}", wo % 2))),
                    ])
                    .unwrap();
                table
                    .put_item(builder.build_put_request(&model, &item).unwrap())
                    .unwrap();
            }
        }
        (schema, table)
    }

    #[test]
    fn test_should_query_by_sort_key_prefix() {
        let (schema, table) = populated();
        let model = workorder_model();
        let sk = schema.primary().sort_key().unwrap().clone();
        let input = ConditionExpressionBuilder::new(&schema)
            .build_request(
                QueryRequest::builder()
                    .hash_key_value("#WORKORDER")
                    .key_condition(sk.begins_with("#ORG:2#").unwrap())
                    .build(),
            )
            .unwrap();

        let page = model
            .page_from_query_output(table.query(&input).unwrap())
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.cursor.is_none());
        assert!(
            page.items
                .iter()
                .all(|item| item.get("org_id") == Some(&Value::from(2)))
        );
    }

    #[test]
    fn test_should_page_through_results_with_cursor() {
        let (schema, table) = populated();
        let model = workorder_model();
        let builder = ConditionExpressionBuilder::new(&schema);
        let sk = schema.primary().sort_key().unwrap().clone();

        let mut seen = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let request = QueryRequest::builder()
                .hash_key_value("#WORKORDER")
                .key_condition(sk.begins_with("#ORG:1#").unwrap())
                .limit(2)
                .build();
            let request = QueryRequest {
                pagination_cursor: cursor.take(),
                ..request
            };
            let input = builder.build_request(request).unwrap();
            let page = model
                .page_from_query_output(table.query(&input).unwrap())
                .unwrap();
            pages += 1;
            seen.extend(
                page.items
                    .iter()
                    .filter_map(|item| item.get("workorder_id").and_then(Value::as_integer)),
            );
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_should_return_descending_order() {
        let (schema, table) = populated();
        let model = workorder_model();
        let sk = schema.primary().sort_key().unwrap().clone();
        let input = ConditionExpressionBuilder::new(&schema)
            .build_request(
                QueryRequest::builder()
                    .hash_key_value("#WORKORDER")
                    .key_condition(sk.begins_with("#ORG:1#").unwrap())
                    .scan_direction(ScanDirection::Backward)
                    .limit(1)
                    .build(),
            )
            .unwrap();
        let page = model
            .page_from_query_output(table.query(&input).unwrap())
            .unwrap();
        assert_eq!(page.items[0].get("workorder_id"), Some(&Value::from(5)));
    }

    #[test]
    fn test_should_apply_filter_after_key_condition() {
        let (schema, table) = populated();
        let model = workorder_model();
        let sk = schema.primary().sort_key().unwrap().clone();
        let workorder_id = model.attribute("workorder_id").unwrap();
        let filter = workorder_id
            .greater_than(1)
            .unwrap()
            .and(workorder_id.less_than(4).unwrap());

        let input = ConditionExpressionBuilder::new(&schema)
            .build_request(
                QueryRequest::builder()
                    .hash_key_value("#WORKORDER")
                    .key_condition(sk.begins_with("#ORG:1#").unwrap())
                    .filter_condition(filter)
                    .build(),
            )
            .unwrap();
        assert_eq!(input.expression_attribute_values.len(), 4);

        let output = table.query(&input).unwrap();
        assert_eq!(output.scanned_count, 5);
        let page = model.page_from_query_output(output).unwrap();
        let ids: Vec<_> = page
            .items
            .iter()
            .filter_map(|item| item.get("workorder_id").and_then(Value::as_integer))
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_should_query_secondary_index() {
        let (schema, table) = populated();
        let model = workorder_model();
        let task_id = schema
            .index(Some("workorder_by_task"))
            .unwrap()
            .sort_key()
            .unwrap()
            .clone();
        let input = ConditionExpressionBuilder::new(&schema)
            .build_request(
                QueryRequest::builder()
                    .hash_key_value("#WORKORDER")
                    .index_name("workorder_by_task")
                    .key_condition(task_id.equals("task-0").unwrap())
                    .build(),
            )
            .unwrap();
        assert_eq!(input.index_name.as_deref(), Some("workorder_by_task"));

        let page = model
            .page_from_query_output(table.query(&input).unwrap())
            .unwrap();
        // Even workorder ids: 2 and 4 in org 1, 2 in org 2.
        assert_eq!(page.items.len(), 3);
    }

    #[test]
    fn test_should_query_hash_only_index_by_integer() {
        let (schema, table) = populated();
        let model = workorder_model();
        let input = ConditionExpressionBuilder::new(&schema)
            .build_request(
                QueryRequest::builder()
                    .hash_key_value(2)
                    .index_name("by_org")
                    .build(),
            )
            .unwrap();
        let page = model
            .page_from_query_output(table.query(&input).unwrap())
            .unwrap();
        assert_eq!(page.items.len(), 2);
    }
}
