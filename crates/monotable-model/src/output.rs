//! Response shapes the mapper decodes after the persistence layer has
//! talked to the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// Output of the `GetItem` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item, or `None` when no item has the requested key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<HashMap<String, AttributeValue>>,
}

/// Output of the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// Matching items. Absent when `Select=COUNT`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<HashMap<String, AttributeValue>>,

    /// Number of items in this page.
    #[serde(default)]
    pub count: u32,

    /// Number of items evaluated before the filter was applied.
    #[serde(default)]
    pub scanned_count: u32,

    /// Where the query stopped; pass it back as `ExclusiveStartKey` to
    /// fetch the next page. Empty on the last page.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: HashMap<String, AttributeValue>,
}
