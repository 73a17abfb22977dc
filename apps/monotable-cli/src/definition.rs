//! Schema definition file.
//!
//! ```json
//! {
//!   "tableName": "test",
//!   "model": {
//!     "name": "Workorder",
//!     "attributes": [
//!       {"name": "hk", "kind": "string", "template": "#WORKORDER"},
//!       {"name": "sk", "kind": "string", "template": "#ORG:${org_id}"},
//!       {"name": "org_id", "kind": "integer", "required": true}
//!     ]
//!   },
//!   "primary": {"hash": "hk", "sort": "sk"},
//!   "indexes": [{"name": "by_org", "type": "gsi", "hash": "org_id"}]
//! }
//! ```
//!
//! Index keys name model attributes, which supply their kinds.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use monotable_core::{AttributeSpec, IndexDescriptor, IndexType, ModelSchema, TableSchema};

/// A model and the table it lives in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    pub table_name: String,
    pub model: ModelDefinition,
    pub primary: KeyDefinition,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

/// Model name and ordered fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub attributes: Vec<AttributeSpec>,
}

/// Hash and optional sort attribute names.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyDefinition {
    pub hash: String,
    #[serde(default)]
    pub sort: Option<String>,
}

/// A secondary index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub index_type: IndexType,
    #[serde(flatten)]
    pub key: KeyDefinition,
}

impl SchemaDefinition {
    /// Read and parse a definition file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read schema file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid schema file {}", path.display()))
    }

    /// Build the validated model and table schemas.
    pub fn into_schemas(self) -> Result<(ModelSchema, TableSchema)> {
        let model = ModelSchema::new(self.model.name, self.model.attributes)?;

        let lookup = |name: &str| -> Result<AttributeSpec> {
            model
                .attribute(name)
                .cloned()
                .ok_or_else(|| anyhow!("key attribute '{name}' is not declared on the model"))
        };
        let sort = self.primary.sort.as_deref().map(lookup).transpose()?;
        let mut builder =
            TableSchema::builder(self.table_name).primary(lookup(&self.primary.hash)?, sort);

        for index in self.indexes {
            let hash = lookup(&index.key.hash)?;
            let sort = index.key.sort.as_deref().map(lookup).transpose()?;
            let descriptor = match (index.index_type, sort) {
                (IndexType::Gsi, sort) => IndexDescriptor::global(index.name, hash, sort),
                (IndexType::Lsi, Some(sort)) => IndexDescriptor::local(index.name, hash, sort),
                (IndexType::Lsi, None) => {
                    return Err(anyhow!("local index '{}' needs a sort key", index.name));
                }
                (IndexType::Primary, _) => {
                    return Err(anyhow!(
                        "index '{}' cannot be primary; declare the table key under \"primary\"",
                        index.name
                    ));
                }
            };
            builder = builder.index(descriptor);
        }

        let table = builder.build()?;
        table.validate_model(&model)?;
        Ok((model, table))
    }
}
