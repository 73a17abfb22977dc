//! Create, store, and read back single items.

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use monotable_core::{ConditionExpressionBuilder, MapperError, Value};

    use crate::{MemoryTable, workorder_model, workorder_table};

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_should_put_and_get_workorder() {
        let model = workorder_model();
        let schema = workorder_table();
        let builder = ConditionExpressionBuilder::new(&schema);
        let mut table = MemoryTable::new(schema.clone());

        let item = model
            .create([
                ("org_id", Value::from(123)),
                ("workorder_id", Value::from(456)),
                ("date_created", Value::from(created())),
            ])
            .unwrap();
        table
            .put_item(builder.build_put_request(&model, &item).unwrap())
            .unwrap();

        let get = builder
            .build_get_request("#WORKORDER", Some(Value::from("#ORG:123#WORKORDER:456")))
            .unwrap();
        let output = table.get_item(&get).unwrap();
        let read = model.item_from_get_output(&get, output).unwrap();

        assert_eq!(read, item);
        assert_eq!(read.get("date_created"), Some(&Value::from(created())));
        assert_eq!(read.get("status"), Some(&Value::from("open")));
    }

    #[test]
    fn test_should_store_timestamp_as_iso_string() {
        let model = workorder_model();
        let schema = workorder_table();
        let item = model
            .create([
                ("org_id", Value::from(1)),
                ("workorder_id", Value::from(2)),
                ("date_created", Value::from("2024-01-01T12:30:00")),
            ])
            .unwrap();
        let put = ConditionExpressionBuilder::new(&schema)
            .build_put_request(&model, &item)
            .unwrap();
        let json = serde_json::to_value(&put).unwrap();
        assert_eq!(json["Item"]["date_created"]["S"], "2024-01-01T12:30:00");
        assert_eq!(json["Item"]["org_id"]["N"], "1");
    }

    #[test]
    fn test_should_replace_item_with_same_key() {
        let model = workorder_model();
        let schema = workorder_table();
        let builder = ConditionExpressionBuilder::new(&schema);
        let mut table = MemoryTable::new(schema.clone());

        for status in ["open", "closed"] {
            let item = model
                .create([
                    ("org_id", Value::from(1)),
                    ("workorder_id", Value::from(2)),
                    ("date_created", Value::from(created())),
                    ("status", Value::from(status)),
                ])
                .unwrap();
            table
                .put_item(builder.build_put_request(&model, &item).unwrap())
                .unwrap();
        }

        assert_eq!(table.len(), 1);
        let get = builder
            .build_get_request("#WORKORDER", Some(Value::from("#ORG:1#WORKORDER:2")))
            .unwrap();
        let read = model
            .item_from_get_output(&get, table.get_item(&get).unwrap())
            .unwrap();
        assert_eq!(read.get("status"), Some(&Value::from("closed")));
    }

    #[test]
    fn test_should_report_missing_item() {
        let model = workorder_model();
        let schema = workorder_table();
        let table = MemoryTable::new(schema.clone());
        let get = ConditionExpressionBuilder::new(&schema)
            .build_get_request("#WORKORDER", Some(Value::from("#ORG:9#WORKORDER:9")))
            .unwrap();
        let err = model
            .item_from_get_output(&get, table.get_item(&get).unwrap())
            .unwrap_err();
        assert!(matches!(err, MapperError::NotFound { ref table, .. } if table == "test"));
        assert!(err.to_string().contains("sk=#ORG:9#WORKORDER:9"));
    }

    #[test]
    fn test_should_refuse_item_without_required_fields() {
        let err = workorder_model()
            .create([("org_id", Value::from(1))])
            .unwrap_err();
        assert_eq!(
            err,
            MapperError::RequiredFieldMissing {
                fields: vec!["workorder_id".to_owned(), "date_created".to_owned()],
            }
        );
    }
}
