//! Preparation of `Query`, `GetItem`, and `PutItem` inputs.
//!
//! The builder never sends anything. It resolves index names against the
//! [`TableSchema`], composes the key condition, merges placeholder bindings,
//! and leaves every option the caller did not set out of the request.

use std::collections::HashMap;

use tracing::debug;
use typed_builder::TypedBuilder;

use monotable_model::input::{GetItemInput, PutItemInput, QueryInput};
use monotable_model::types::Select;
use monotable_model::{ExpressionAttributeValues, Key};

use crate::codec::Value;
use crate::condition::Condition;
use crate::config::MonotableConfig;
use crate::error::{MapperError, MapperResult};
use crate::item::Item;
use crate::schema::{IndexDescriptor, IndexType, ModelSchema, TableSchema};

/// Sort-key order of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanDirection {
    /// Ascending.
    #[default]
    Forward,
    /// Descending.
    Backward,
}

/// Parameters of one query.
///
/// Only `hash_key_value` is mandatory:
///
/// ```
/// use monotable_core::{AttributeSpec, QueryRequest};
///
/// let sk = AttributeSpec::string("sk");
/// let request = QueryRequest::builder()
///     .hash_key_value("#WORKORDER")
///     .key_condition(sk.begins_with("#ORG:456").unwrap())
///     .limit(25)
///     .build();
/// assert_eq!(request.limit, Some(25));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct QueryRequest {
    /// Value the partition key must equal.
    #[builder(setter(into))]
    pub hash_key_value: Value,

    /// Condition on the index sort key.
    #[builder(default, setter(strip_option))]
    pub key_condition: Option<Condition>,

    /// Post-read filter on non-key attributes.
    #[builder(default, setter(strip_option))]
    pub filter_condition: Option<Condition>,

    /// Maximum number of items to evaluate.
    #[builder(default, setter(strip_option))]
    pub limit: Option<u32>,

    /// Index to query; the configured default when unset.
    #[builder(default, setter(strip_option, into))]
    pub index_name: Option<String>,

    /// Which attributes the store returns.
    #[builder(default, setter(strip_option))]
    pub select: Option<Select>,

    /// Strongly consistent read.
    #[builder(default, setter(strip_option))]
    pub consistent_read: Option<bool>,

    /// Sort-key order.
    #[builder(default, setter(strip_option))]
    pub scan_direction: Option<ScanDirection>,

    /// Previous page's cursor.
    #[builder(default, setter(strip_option))]
    pub pagination_cursor: Option<Key>,

    /// Attribute names to return; all when empty.
    #[builder(default)]
    pub projection: Vec<String>,
}

/// Builds store requests for one table.
#[derive(Debug, Clone)]
pub struct ConditionExpressionBuilder<'a> {
    table: &'a TableSchema,
    table_name: String,
    default_index: Option<String>,
    consistent_read: Option<bool>,
}

impl<'a> ConditionExpressionBuilder<'a> {
    /// A builder that queries the primary index by default.
    #[must_use]
    pub fn new(table: &'a TableSchema) -> Self {
        Self {
            table,
            table_name: table.table_name().to_owned(),
            default_index: None,
            consistent_read: None,
        }
    }

    /// A builder honouring the table name override, default index, and
    /// default read mode of `config`.
    #[must_use]
    pub fn with_config(table: &'a TableSchema, config: &MonotableConfig) -> Self {
        Self {
            table,
            table_name: config
                .table_name
                .clone()
                .unwrap_or_else(|| table.table_name().to_owned()),
            default_index: Some(config.default_index.clone()),
            consistent_read: config.consistent_read,
        }
    }

    /// Table name written into every request.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `hash = :v`, AND-combined with `sort_key_condition` when given.
    pub fn build_key_condition(
        index: &IndexDescriptor,
        hash_key_value: impl Into<Value>,
        sort_key_condition: Option<Condition>,
    ) -> MapperResult<Condition> {
        let hash = index.hash_key().equals(hash_key_value)?;
        match sort_key_condition {
            None => Ok(hash),
            Some(_) if index.sort_key().is_none() => Err(MapperError::schema(format!(
                "index '{}' has no sort key, so it takes no sort key condition",
                index.name()
            ))),
            Some(sort) => Ok(hash.and(sort)),
        }
    }

    /// Assemble the `Query` input for `request`.
    pub fn build_request(&self, request: QueryRequest) -> MapperResult<QueryInput> {
        let index_name = request
            .index_name
            .as_deref()
            .or(self.default_index.as_deref());
        let index = self.table.index(index_name)?;

        if request.limit == Some(0) {
            return Err(MapperError::schema("Limit must be greater than 0"));
        }
        let consistent_read = match (index.index_type(), request.consistent_read) {
            (IndexType::Gsi, Some(true)) => {
                return Err(MapperError::schema(format!(
                    "global secondary index '{}' does not support consistent reads",
                    index.name()
                )));
            }
            (IndexType::Gsi, explicit) => explicit,
            (_, explicit) => explicit.or(self.consistent_read),
        };

        let key = Self::build_key_condition(index, request.hash_key_value, request.key_condition)?;
        ensure_no_collisions(&key)?;
        let (key_condition_expression, mut values) = key.into_parts();

        let filter_expression = match request.filter_condition {
            Some(filter) => {
                ensure_no_collisions(&filter)?;
                let (expression, bindings) = filter.into_parts();
                merge_bindings(&mut values, bindings)?;
                Some(expression)
            }
            None => None,
        };

        let input = QueryInput {
            table_name: self.table_name.clone(),
            index_name: (!index.is_primary()).then(|| index.name().to_owned()),
            key_condition_expression,
            filter_expression,
            projection_expression: projection_expression(&request.projection),
            expression_attribute_values: values,
            scan_index_forward: request
                .scan_direction
                .map(|d| d == ScanDirection::Forward),
            limit: request.limit,
            exclusive_start_key: request.pagination_cursor.unwrap_or_default(),
            select: request.select,
            consistent_read,
        };
        debug!(
            table = %input.table_name,
            index = index.name(),
            key_condition = %input.key_condition_expression,
            "built query request"
        );
        Ok(input)
    }

    /// Assemble the `GetItem` input for the item with the given primary key.
    pub fn build_get_request(
        &self,
        hash_key_value: impl Into<Value>,
        sort_key_value: Option<Value>,
    ) -> MapperResult<GetItemInput> {
        let primary = self.table.primary();
        let mut key = HashMap::new();
        key.insert(
            primary.hash_key().name().to_owned(),
            primary.hash_key().serialize(&hash_key_value.into())?,
        );
        match (primary.sort_key(), sort_key_value) {
            (Some(sort), Some(value)) => {
                key.insert(sort.name().to_owned(), sort.serialize(&value)?);
            }
            (Some(sort), None) => {
                return Err(MapperError::schema(format!(
                    "table '{}' needs a value for sort key '{}'",
                    self.table_name,
                    sort.name()
                )));
            }
            (None, Some(_)) => {
                return Err(MapperError::schema(format!(
                    "table '{}' has no sort key",
                    self.table_name
                )));
            }
            (None, None) => {}
        }
        debug!(table = %self.table_name, "built get request");
        Ok(GetItemInput {
            table_name: self.table_name.clone(),
            key,
            consistent_read: self.consistent_read,
            projection_expression: None,
        })
    }

    /// The primary key of a resolved item.
    pub fn build_item_key(&self, item: &Item) -> MapperResult<Key> {
        let primary = self.table.primary();
        let mut key = HashMap::new();
        let mut missing = Vec::new();
        for spec in std::iter::once(primary.hash_key()).chain(primary.sort_key()) {
            match item.get(spec.name()) {
                Some(value) => {
                    key.insert(spec.name().to_owned(), spec.serialize(value)?);
                }
                None => missing.push(spec.name().to_owned()),
            }
        }
        if !missing.is_empty() {
            return Err(MapperError::RequiredFieldMissing { fields: missing });
        }
        Ok(key)
    }

    /// Assemble the `PutItem` input that stores `item`.
    pub fn build_put_request(
        &self,
        model: &ModelSchema,
        item: &Item,
    ) -> MapperResult<PutItemInput> {
        self.table.validate_model(model)?;
        self.build_item_key(item)?;
        let wire = model.to_wire(item)?;
        debug!(
            table = %self.table_name,
            model = model.name(),
            attributes = wire.len(),
            "built put request"
        );
        Ok(PutItemInput {
            table_name: self.table_name.clone(),
            item: wire,
        })
    }
}

fn ensure_no_collisions(condition: &Condition) -> MapperResult<()> {
    match condition.collisions().iter().next() {
        Some(placeholder) => Err(MapperError::PlaceholderCollision {
            placeholder: placeholder.clone(),
        }),
        None => Ok(()),
    }
}

fn merge_bindings(
    into: &mut ExpressionAttributeValues,
    from: ExpressionAttributeValues,
) -> MapperResult<()> {
    for (placeholder, value) in from {
        if into.get(&placeholder).is_some_and(|existing| *existing != value) {
            return Err(MapperError::PlaceholderCollision { placeholder });
        }
        into.insert(placeholder, value);
    }
    Ok(())
}

fn projection_expression(projection: &[String]) -> Option<String> {
    (!projection.is_empty()).then(|| projection.join(", "))
}
