//! Explicit model and table schemas.
//!
//! Fields are declared up front as an ordered list of [`AttributeSpec`]s;
//! nothing is discovered by introspection, and specs never hold item values.
//! Indexes are described by [`IndexDescriptor`]s collected in a
//! [`TableSchema`], which also renders the table administration requests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use monotable_model::input::{CreateTableInput, DeleteTableInput};
use monotable_model::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    LocalSecondaryIndex, Projection, ProjectionType,
};

use crate::codec::{AttributeKind, Value};
use crate::error::{MapperError, MapperResult};

/// Name of the table's own key schema.
pub const PRIMARY_INDEX: &str = "primary";

// ---------------------------------------------------------------------------
// AttributeSpec
// ---------------------------------------------------------------------------

/// One named field of a model.
///
/// A `template` may embed `${other_field}` references that are resolved when
/// an item is created; a template without references is a constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    name: String,
    kind: AttributeKind,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    template: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl AttributeSpec {
    /// A new optional field with no template and no default.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            template: None,
            required: false,
            default: None,
        }
    }

    /// A string field.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    /// An integer field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Integer)
    }

    /// A UTC timestamp field.
    #[must_use]
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::UtcTimestamp)
    }

    /// Set the template. An empty template means "no template".
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.template = (!template.is_empty()).then_some(template);
        self
    }

    /// Mark the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the caller supplies none and there is no template.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Template string, if any.
    #[must_use]
    pub fn template_str(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Whether the field must end up with a value.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Default value, if any.
    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let template = Option::<String>::deserialize(deserializer)?;
    Ok(template.filter(|t| !t.is_empty()))
}

// ---------------------------------------------------------------------------
// ModelSchema
// ---------------------------------------------------------------------------

/// The ordered field list of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    name: String,
    attributes: Vec<AttributeSpec>,
}

impl ModelSchema {
    /// Start declaring a model.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Build a model from a field list, rejecting empty or duplicate names.
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeSpec>) -> MapperResult<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        for spec in &attributes {
            if spec.name().is_empty() {
                return Err(MapperError::schema(format!(
                    "model '{name}' declares a field with an empty name"
                )));
            }
            if !seen.insert(spec.name()) {
                return Err(MapperError::schema(format!(
                    "model '{name}' declares field '{}' twice",
                    spec.name()
                )));
            }
        }
        Ok(Self { name, attributes })
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    /// Look up a field by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name() == name)
    }
}

/// Builder for [`ModelSchema`].
#[derive(Debug, Clone)]
pub struct ModelSchemaBuilder {
    name: String,
    attributes: Vec<AttributeSpec>,
}

impl ModelSchemaBuilder {
    /// Append a field.
    #[must_use]
    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    /// Finish the model.
    pub fn build(self) -> MapperResult<ModelSchema> {
        ModelSchema::new(self.name, self.attributes)
    }
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

/// Kind of index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    /// The table's own key schema.
    Primary,
    /// Global secondary index.
    #[default]
    Gsi,
    /// Local secondary index; shares the table's hash key.
    Lsi,
}

/// Hash and optional sort key of one named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    name: String,
    index_type: IndexType,
    hash_key: AttributeSpec,
    sort_key: Option<AttributeSpec>,
}

impl IndexDescriptor {
    /// The table's primary key schema.
    #[must_use]
    pub fn primary(hash_key: AttributeSpec, sort_key: Option<AttributeSpec>) -> Self {
        Self {
            name: PRIMARY_INDEX.to_owned(),
            index_type: IndexType::Primary,
            hash_key,
            sort_key,
        }
    }

    /// A global secondary index.
    #[must_use]
    pub fn global(
        name: impl Into<String>,
        hash_key: AttributeSpec,
        sort_key: Option<AttributeSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            index_type: IndexType::Gsi,
            hash_key,
            sort_key,
        }
    }

    /// A local secondary index. Its hash key must match the table's.
    #[must_use]
    pub fn local(
        name: impl Into<String>,
        hash_key: AttributeSpec,
        sort_key: AttributeSpec,
    ) -> Self {
        Self {
            name: name.into(),
            index_type: IndexType::Lsi,
            hash_key,
            sort_key: Some(sort_key),
        }
    }

    /// Index name; [`PRIMARY_INDEX`] for the table itself.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of index.
    #[must_use]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Partition key.
    #[must_use]
    pub fn hash_key(&self) -> &AttributeSpec {
        &self.hash_key
    }

    /// Sort key, if the index has one.
    #[must_use]
    pub fn sort_key(&self) -> Option<&AttributeSpec> {
        self.sort_key.as_ref()
    }

    /// Whether this is the table's own key schema.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.index_type == IndexType::Primary
    }

    fn key_schema(&self) -> Vec<KeySchemaElement> {
        let mut elements = vec![KeySchemaElement {
            attribute_name: self.hash_key.name().to_owned(),
            key_type: KeyType::Hash,
        }];
        if let Some(sort) = &self.sort_key {
            elements.push(KeySchemaElement {
                attribute_name: sort.name().to_owned(),
                key_type: KeyType::Range,
            });
        }
        elements
    }
}

// ---------------------------------------------------------------------------
// TableSchema
// ---------------------------------------------------------------------------

/// A table name plus its primary key schema and secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table_name: String,
    indexes: Vec<IndexDescriptor>,
}

impl TableSchema {
    /// Start declaring a table.
    #[must_use]
    pub fn builder(table_name: impl Into<String>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            table_name: table_name.into(),
            indexes: Vec::new(),
        }
    }

    /// Table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Replace the table name, e.g. from configuration.
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// All indexes, primary first.
    #[must_use]
    pub fn indexes(&self) -> &[IndexDescriptor] {
        &self.indexes
    }

    /// The primary key schema.
    #[must_use]
    pub fn primary(&self) -> &IndexDescriptor {
        // The builder guarantees the primary index sits at position 0.
        &self.indexes[0]
    }

    /// Look up an index by name; `None` selects the primary index.
    pub fn index(&self, name: Option<&str>) -> MapperResult<&IndexDescriptor> {
        let name = name.unwrap_or(PRIMARY_INDEX);
        self.indexes
            .iter()
            .find(|i| i.name() == name)
            .ok_or_else(|| {
                MapperError::schema(format!(
                    "table '{}' has no index named '{name}'",
                    self.table_name
                ))
            })
    }

    /// Check that `model` declares every key attribute of the primary index.
    pub fn validate_model(&self, model: &ModelSchema) -> MapperResult<()> {
        let primary = self.primary();
        let keys = std::iter::once(primary.hash_key()).chain(primary.sort_key());
        for key in keys {
            if model.attribute(key.name()).is_none() {
                return Err(MapperError::schema(format!(
                    "key attribute '{}' is not on model '{}'",
                    key.name(),
                    model.name()
                )));
            }
        }
        Ok(())
    }

    /// The `CreateTable` request for this schema, billed per request.
    ///
    /// Every secondary index projects all attributes.
    #[must_use]
    pub fn create_table_input(&self) -> CreateTableInput {
        let mut attribute_definitions: Vec<AttributeDefinition> = Vec::new();
        for index in &self.indexes {
            for key in std::iter::once(index.hash_key()).chain(index.sort_key()) {
                if !attribute_definitions
                    .iter()
                    .any(|d| d.attribute_name == key.name())
                {
                    attribute_definitions.push(AttributeDefinition {
                        attribute_name: key.name().to_owned(),
                        attribute_type: key.kind().scalar_type(),
                    });
                }
            }
        }

        let projection = || Projection {
            projection_type: Some(ProjectionType::All),
        };
        let mut global_secondary_indexes = Vec::new();
        let mut local_secondary_indexes = Vec::new();
        for index in &self.indexes {
            match index.index_type() {
                IndexType::Primary => {}
                IndexType::Gsi => global_secondary_indexes.push(GlobalSecondaryIndex {
                    index_name: index.name().to_owned(),
                    key_schema: index.key_schema(),
                    projection: projection(),
                }),
                IndexType::Lsi => local_secondary_indexes.push(LocalSecondaryIndex {
                    index_name: index.name().to_owned(),
                    key_schema: index.key_schema(),
                    projection: projection(),
                }),
            }
        }

        CreateTableInput {
            table_name: self.table_name.clone(),
            key_schema: self.primary().key_schema(),
            attribute_definitions,
            billing_mode: Some(BillingMode::PayPerRequest),
            global_secondary_indexes,
            local_secondary_indexes,
        }
    }

    /// The `DeleteTable` request for this table.
    #[must_use]
    pub fn delete_table_input(&self) -> DeleteTableInput {
        DeleteTableInput {
            table_name: self.table_name.clone(),
        }
    }
}

/// Builder for [`TableSchema`].
#[derive(Debug, Clone)]
pub struct TableSchemaBuilder {
    table_name: String,
    indexes: Vec<IndexDescriptor>,
}

impl TableSchemaBuilder {
    /// Set the primary key schema.
    #[must_use]
    pub fn primary(self, hash_key: AttributeSpec, sort_key: Option<AttributeSpec>) -> Self {
        self.index(IndexDescriptor::primary(hash_key, sort_key))
    }

    /// Add an index.
    #[must_use]
    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    /// Validate and finish the table.
    ///
    /// Exactly one primary index is required, index names must be unique,
    /// and local indexes must reuse the primary hash key.
    pub fn build(mut self) -> MapperResult<TableSchema> {
        if self.table_name.is_empty() {
            return Err(MapperError::schema("table name must not be empty"));
        }

        let primaries = self.indexes.iter().filter(|i| i.is_primary()).count();
        if primaries != 1 {
            return Err(MapperError::schema(format!(
                "table '{}' needs exactly one primary index, found {primaries}",
                self.table_name
            )));
        }
        // Keep the primary index first so `TableSchema::primary` is a plain lookup.
        self.indexes.sort_by_key(|i| !i.is_primary());

        let mut names = HashSet::new();
        for index in &self.indexes {
            if !names.insert(index.name()) {
                return Err(MapperError::schema(format!(
                    "index '{}' is declared twice",
                    index.name()
                )));
            }
            if !index.is_primary() && index.name() == PRIMARY_INDEX {
                return Err(MapperError::schema(format!(
                    "'{PRIMARY_INDEX}' is reserved for the table key schema"
                )));
            }
        }

        let primary_hash = self.indexes[0].hash_key().name().to_owned();
        if let Some(lsi) = self
            .indexes
            .iter()
            .find(|i| i.index_type() == IndexType::Lsi && i.hash_key().name() != primary_hash)
        {
            return Err(MapperError::schema(format!(
                "local index '{}' must use the table hash key '{primary_hash}'",
                lsi.name()
            )));
        }

        Ok(TableSchema {
            table_name: self.table_name,
            indexes: self.indexes,
        })
    }
}
