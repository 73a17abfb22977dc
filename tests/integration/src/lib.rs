//! End-to-end tests for Monotable.
//!
//! Requests built by the mapper are executed against [`MemoryTable`], a small
//! in-process table that understands the expressions the mapper emits, and
//! the responses are decoded back into items.
//!
//! ```text
//! cargo test -p monotable-integration
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Once;

use anyhow::{Result, anyhow, bail};
use tracing::debug;

use monotable_core::{AttributeSpec, IndexDescriptor, ModelSchema, TableSchema};
use monotable_model::input::{GetItemInput, PutItemInput, QueryInput};
use monotable_model::output::{GetItemOutput, QueryOutput};
use monotable_model::{AttributeValue, Item, Key};

#[cfg(test)]
mod test_item;
#[cfg(test)]
mod test_query;
#[cfg(test)]
mod test_table;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// The `Workorder` model used across the tests.
#[must_use]
pub fn workorder_model() -> ModelSchema {
    init_tracing();
    ModelSchema::builder("Workorder")
        .attribute(AttributeSpec::string("hk").template("#WORKORDER"))
        .attribute(AttributeSpec::string("sk").template("#ORG:${org_id}#WORKORDER:${workorder_id}"))
        .attribute(AttributeSpec::integer("org_id").required())
        .attribute(AttributeSpec::integer("workorder_id").required())
        .attribute(AttributeSpec::string("task_id"))
        .attribute(AttributeSpec::string("status").default_value("open"))
        .attribute(AttributeSpec::timestamp("date_created").required())
        .build()
        .unwrap_or_else(|e| panic!("workorder model is invalid: {e}"))
}

/// The table the `Workorder` model lives in.
#[must_use]
pub fn workorder_table() -> TableSchema {
    TableSchema::builder("test")
        .primary(AttributeSpec::string("hk"), Some(AttributeSpec::string("sk")))
        .index(IndexDescriptor::global(
            "workorder_by_task",
            AttributeSpec::string("hk"),
            Some(AttributeSpec::string("task_id")),
        ))
        .index(IndexDescriptor::global(
            "by_org",
            AttributeSpec::integer("org_id"),
            None,
        ))
        .build()
        .unwrap_or_else(|e| panic!("workorder table is invalid: {e}"))
}

/// An in-memory table for one [`TableSchema`].
#[derive(Debug)]
pub struct MemoryTable {
    schema: TableSchema,
    items: Vec<Item>,
}

impl MemoryTable {
    /// Create an empty table.
    #[must_use]
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            items: Vec::new(),
        }
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the table holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Store an item, replacing any item with the same primary key.
    pub fn put_item(&mut self, input: PutItemInput) -> Result<()> {
        self.check_table(&input.table_name)?;
        let key = self.primary_key(&input.item)?;
        self.items.retain(|item| !key_matches(item, &key));
        self.items.push(input.item);
        debug!(items = self.items.len(), "stored item");
        Ok(())
    }

    /// Look up one item by its full primary key.
    pub fn get_item(&self, input: &GetItemInput) -> Result<GetItemOutput> {
        self.check_table(&input.table_name)?;
        let item = self
            .items
            .iter()
            .find(|item| key_matches(item, &input.key))
            .cloned();
        Ok(GetItemOutput { item })
    }

    /// Run a query: key condition, sort order, pagination, limit, filter.
    pub fn query(&self, input: &QueryInput) -> Result<QueryOutput> {
        self.check_table(&input.table_name)?;
        let index = self.schema.index(input.index_name.as_deref())?;
        let values = &input.expression_attribute_values;

        let mut candidates = Vec::new();
        for item in &self.items {
            if evaluate(&input.key_condition_expression, item, values)? {
                candidates.push(item);
            }
        }
        if let Some(sort) = index.sort_key() {
            candidates.sort_by(|a, b| compare_attr(a.get(sort.name()), b.get(sort.name())));
        }
        if input.scan_index_forward == Some(false) {
            candidates.reverse();
        }
        if !input.exclusive_start_key.is_empty() {
            match candidates
                .iter()
                .position(|item| key_matches(item, &input.exclusive_start_key))
            {
                Some(pos) => {
                    candidates.drain(..=pos);
                }
                None => bail!("exclusive start key does not match any item"),
            }
        }

        let limit = input.limit.map_or(candidates.len(), |l| l as usize);
        let more = candidates.len() > limit;
        candidates.truncate(limit);

        let last_evaluated_key = match candidates.last() {
            Some(last) if more => self.cursor_for(last, index),
            _ => HashMap::new(),
        };
        let scanned_count = u32::try_from(candidates.len())?;

        let mut items = Vec::new();
        for item in candidates {
            let keep = match &input.filter_expression {
                Some(filter) => evaluate(filter, item, values)?,
                None => true,
            };
            if keep {
                items.push(item.clone());
            }
        }

        Ok(QueryOutput {
            count: u32::try_from(items.len())?,
            items,
            scanned_count,
            last_evaluated_key,
        })
    }

    fn check_table(&self, table_name: &str) -> Result<()> {
        if table_name != self.schema.table_name() {
            bail!("requested table '{table_name}' does not exist");
        }
        Ok(())
    }

    fn primary_key(&self, item: &Item) -> Result<Key> {
        let primary = self.schema.primary();
        std::iter::once(primary.hash_key())
            .chain(primary.sort_key())
            .map(|spec| {
                item.get(spec.name())
                    .map(|v| (spec.name().to_owned(), v.clone()))
                    .ok_or_else(|| anyhow!("item lacks key attribute '{}'", spec.name()))
            })
            .collect()
    }

    fn cursor_for(&self, item: &Item, index: &IndexDescriptor) -> Key {
        let primary = self.schema.primary();
        [
            Some(primary.hash_key()),
            primary.sort_key(),
            Some(index.hash_key()),
            index.sort_key(),
        ]
        .into_iter()
        .flatten()
        .filter_map(|spec| {
            item.get(spec.name())
                .map(|v| (spec.name().to_owned(), v.clone()))
        })
        .collect()
    }
}

fn key_matches(item: &Item, key: &Key) -> bool {
    key.iter().all(|(name, value)| item.get(name) == Some(value))
}

fn compare_attr(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) => {
            match (x.parse::<i64>(), y.parse::<i64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(AttributeValue::S(x)), Some(AttributeValue::S(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Evaluate an AND-chain of comparisons as emitted by the mapper.
fn evaluate(
    expression: &str,
    item: &Item,
    values: &HashMap<String, AttributeValue>,
) -> Result<bool> {
    if expression.contains(" OR ") || expression.starts_with('(') {
        bail!("unsupported expression: {expression}");
    }
    for clause in expression.split(" AND ") {
        if !evaluate_clause(clause.trim(), item, values)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn evaluate_clause(
    clause: &str,
    item: &Item,
    values: &HashMap<String, AttributeValue>,
) -> Result<bool> {
    let bound = |placeholder: &str| {
        values
            .get(placeholder)
            .ok_or_else(|| anyhow!("placeholder {placeholder} is not bound"))
    };

    if let Some(args) = clause
        .strip_prefix("begins_with(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let (name, placeholder) = args
            .split_once(", ")
            .ok_or_else(|| anyhow!("malformed begins_with: {clause}"))?;
        let prefix = bound(placeholder)?;
        return Ok(match (item.get(name), prefix) {
            (Some(AttributeValue::S(s)), AttributeValue::S(p)) => s.starts_with(p.as_str()),
            _ => false,
        });
    }

    let mut parts = clause.splitn(3, ' ');
    let (Some(name), Some(op), Some(placeholder)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed comparison: {clause}");
    };
    let expected = bound(placeholder)?;
    let Some(actual) = item.get(name) else {
        return Ok(false);
    };
    if actual.type_tag() != expected.type_tag() {
        return Ok(false);
    }
    let ordering = compare_attr(Some(actual), Some(expected));
    Ok(match op {
        "=" => ordering == Ordering::Equal,
        ">" => ordering == Ordering::Greater,
        "<" => ordering == Ordering::Less,
        other => bail!("unsupported operator {other}"),
    })
}
