//! Table administration requests and configuration overrides.

#[cfg(test)]
mod tests {
    use monotable_core::{ConditionExpressionBuilder, MonotableConfig, QueryRequest};

    use crate::{workorder_model, workorder_table};

    #[test]
    fn test_should_render_create_table_request_json() {
        let input = workorder_table().create_table_input();
        let json = serde_json::to_value(&input).unwrap();

        assert_eq!(json["TableName"], "test");
        assert_eq!(json["BillingMode"], "PAY_PER_REQUEST");
        assert_eq!(
            json["KeySchema"],
            serde_json::json!([
                {"AttributeName": "hk", "KeyType": "HASH"},
                {"AttributeName": "sk", "KeyType": "RANGE"}
            ])
        );
        assert_eq!(json["AttributeDefinitions"].as_array().unwrap().len(), 4);
        let gsis = json["GlobalSecondaryIndexes"].as_array().unwrap();
        assert_eq!(gsis.len(), 2);
        assert_eq!(gsis[1]["IndexName"], "by_org");
        assert_eq!(gsis[1]["Projection"]["ProjectionType"], "ALL");
        assert!(json.get("LocalSecondaryIndexes").is_none());
    }

    #[test]
    fn test_should_render_delete_table_request_json() {
        let json = serde_json::to_string(&workorder_table().delete_table_input()).unwrap();
        assert_eq!(json, r#"{"TableName":"test"}"#);
    }

    #[test]
    fn test_should_accept_model_matching_table_keys() {
        assert!(workorder_table().validate_model(&workorder_model()).is_ok());
    }

    #[test]
    fn test_should_route_requests_using_environment_config() {
        let schema = workorder_table();
        let config = MonotableConfig::from_lookup(|key| match key {
            "MONOTABLE_TABLE_NAME" => Some("workorders-prod".to_owned()),
            "MONOTABLE_CONSISTENT_READ" => Some("true".to_owned()),
            _ => None,
        })
        .unwrap();
        let builder = ConditionExpressionBuilder::with_config(&schema, &config);

        let input = builder
            .build_request(QueryRequest::builder().hash_key_value("#WORKORDER").build())
            .unwrap();
        assert_eq!(input.table_name, "workorders-prod");
        assert_eq!(input.consistent_read, Some(true));
        assert!(input.index_name.is_none());
    }
}
