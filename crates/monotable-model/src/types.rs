//! Shared wire types: key schema, index definitions, and read options.
//!
//! Structs use `#[serde(rename_all = "PascalCase")]` to match the store's API.
//! Enum variants are idiomatic Rust names mapped to the `SCREAMING_SNAKE_CASE`
//! strings the store expects.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Role of an attribute within a key schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition (hash) key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort (range) key.
    #[serde(rename = "RANGE")]
    Range,
}

impl KeyType {
    /// Returns the wire-format string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Range => "RANGE",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar types a key attribute may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarAttributeType {
    /// String.
    S,
    /// Number.
    N,
}

impl ScalarAttributeType {
    /// Returns the wire-format string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
        }
    }
}

impl std::fmt::Display for ScalarAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the table is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BillingMode {
    /// Explicit read/write capacity.
    #[serde(rename = "PROVISIONED")]
    Provisioned,
    /// On-demand.
    #[default]
    #[serde(rename = "PAY_PER_REQUEST")]
    PayPerRequest,
}

/// Which attributes a secondary index carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionType {
    /// Every attribute of the item.
    #[default]
    #[serde(rename = "ALL")]
    All,
    /// Only the index and table keys.
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
}

/// Attributes to return from a `Query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Select {
    /// All attributes of each item.
    #[default]
    #[serde(rename = "ALL_ATTRIBUTES")]
    AllAttributes,
    /// All attributes projected into the queried index.
    #[serde(rename = "ALL_PROJECTED_ATTRIBUTES")]
    AllProjectedAttributes,
    /// Only the attributes named in `ProjectionExpression`.
    #[serde(rename = "SPECIFIC_ATTRIBUTES")]
    SpecificAttributes,
    /// Only the number of matching items.
    #[serde(rename = "COUNT")]
    Count,
}

impl Select {
    /// Returns the wire-format string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllAttributes => "ALL_ATTRIBUTES",
            Self::AllProjectedAttributes => "ALL_PROJECTED_ATTRIBUTES",
            Self::SpecificAttributes => "SPECIFIC_ATTRIBUTES",
            Self::Count => "COUNT",
        }
    }
}

impl std::fmt::Display for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Structs - Key schema
// ---------------------------------------------------------------------------

/// One element of a table or index key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    /// The key attribute name.
    pub attribute_name: String,
    /// `HASH` or `RANGE`.
    pub key_type: KeyType,
}

/// Declares the scalar type of an attribute used by a key schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    /// The attribute name.
    pub attribute_name: String,
    /// `S` or `N`.
    pub attribute_type: ScalarAttributeType,
}

// ---------------------------------------------------------------------------
// Structs - Secondary indexes
// ---------------------------------------------------------------------------

/// Projection settings for a secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    /// The set of attributes projected into the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_type: Option<ProjectionType>,
}

/// Global secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndex {
    /// Index name.
    pub index_name: String,
    /// Partition key and optional sort key of the index.
    pub key_schema: Vec<KeySchemaElement>,
    /// Attributes copied into the index.
    pub projection: Projection,
}

/// Local secondary index definition; shares the table's partition key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalSecondaryIndex {
    /// Index name.
    pub index_name: String,
    /// Table partition key plus the index sort key.
    pub key_schema: Vec<KeySchemaElement>,
    /// Attributes copied into the index.
    pub projection: Projection,
}

// ---------------------------------------------------------------------------
// Type aliases for common item shapes
// ---------------------------------------------------------------------------

/// An item as a map of attribute names to wire values.
pub type Item = HashMap<String, AttributeValue>;

/// A primary key as a map of key attribute names to wire values.
pub type Key = HashMap<String, AttributeValue>;

/// Expression attribute values (`:placeholder` to wire value).
pub type ExpressionAttributeValues = HashMap<String, AttributeValue>;
