//! Request shapes the mapper prepares for the persistence layer.
//!
//! Optional fields are omitted when `None`, and empty maps are omitted, so a
//! serialized request carries only what the caller actually asked for.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::types::{
    AttributeDefinition, BillingMode, ExpressionAttributeValues, GlobalSecondaryIndex,
    KeySchemaElement, LocalSecondaryIndex, Select,
};

// ---------------------------------------------------------------------------
// Table administration
// ---------------------------------------------------------------------------

/// Input for the `CreateTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,

    /// Partition key and optional sort key of the table.
    pub key_schema: Vec<KeySchemaElement>,

    /// Scalar types of every attribute used by the table or its indexes.
    pub attribute_definitions: Vec<AttributeDefinition>,

    /// Billing mode of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_mode: Option<BillingMode>,

    /// Global secondary indexes to create.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,

    /// Local secondary indexes to create.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

/// Input for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The name of the table to delete.
    pub table_name: String,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The table to write to.
    pub table_name: String,

    /// The full item, keyed by attribute name.
    pub item: HashMap<String, AttributeValue>,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The table to read from.
    pub table_name: String,

    /// The primary key of the item.
    pub key: HashMap<String, AttributeValue>,

    /// Strongly consistent read when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,

    /// Comma-separated attribute names to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The table to query.
    pub table_name: String,

    /// A secondary index to query instead of the table itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// Condition on the partition key and, optionally, the sort key.
    pub key_condition_expression: String,

    /// Post-read filter over non-key attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Comma-separated attribute names to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Values bound to every placeholder in the key condition and filter.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: ExpressionAttributeValues,

    /// `true` for ascending sort-key order, `false` for descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,

    /// Maximum number of items to evaluate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Key of the item to resume after; the previous page's `LastEvaluatedKey`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub exclusive_start_key: HashMap<String, AttributeValue>,

    /// The attributes to be returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Select>,

    /// Strongly consistent read when `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistent_read: Option<bool>,
}
