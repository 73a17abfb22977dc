//! Resolved items and their conversion to and from wire items.

use std::collections::HashMap;

use monotable_model::input::GetItemInput;
use monotable_model::output::{GetItemOutput, QueryOutput};
use monotable_model::{AttributeValue, Key};

use crate::codec::Value;
use crate::error::{MapperError, MapperResult};
use crate::schema::ModelSchema;
use crate::template::TemplateResolver;

/// A fully resolved item of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    model: String,
    values: HashMap<String, Value>,
}

impl Item {
    /// Name of the model the item belongs to.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Value of one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// All present fields.
    #[must_use]
    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    /// Consume the item, keeping its values.
    #[must_use]
    pub fn into_values(self) -> HashMap<String, Value> {
        self.values
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Decoded items in store order.
    pub items: Vec<Item>,
    /// Pass to `QueryRequest::pagination_cursor` to fetch the next page;
    /// `None` on the last page.
    pub cursor: Option<Key>,
}

impl ModelSchema {
    /// Create an item from caller values.
    ///
    /// Templates are resolved, defaults applied, and every value is coerced
    /// to its field's kind. Values for undeclared fields are rejected.
    pub fn create<I, K, V>(&self, values: I) -> MapperResult<Item>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut supplied = HashMap::new();
        for (field, value) in values {
            let field = field.into();
            if self.attribute(&field).is_none() {
                return Err(MapperError::UnknownField {
                    model: self.name().to_owned(),
                    field,
                });
            }
            supplied.insert(field, value.into());
        }

        let mut resolved = TemplateResolver::resolve(self.attributes(), supplied)?;
        for spec in self.attributes() {
            if let Some(value) = resolved.get_mut(spec.name()) {
                *value = spec
                    .kind()
                    .coerce(value)
                    .map_err(|e| e.for_field(spec.name()))?;
            }
        }

        Ok(Item {
            model: self.name().to_owned(),
            values: resolved,
        })
    }

    /// Serialize an item into a wire item.
    pub fn to_wire(&self, item: &Item) -> MapperResult<HashMap<String, AttributeValue>> {
        if item.model_name() != self.name() {
            return Err(MapperError::schema(format!(
                "item of model '{}' passed to model '{}'",
                item.model_name(),
                self.name()
            )));
        }
        self.attributes()
            .iter()
            .filter_map(|spec| item.get(spec.name()).map(|value| (spec, value)))
            .map(|(spec, value)| {
                spec.serialize(value)
                    .map(|wire| (spec.name().to_owned(), wire))
            })
            .collect()
    }

    /// Decode a wire item.
    ///
    /// Attributes the model does not declare are ignored, since other models
    /// share the table. Required fields are not enforced on read.
    pub fn item_from_wire(&self, wire: &HashMap<String, AttributeValue>) -> MapperResult<Item> {
        let mut values = HashMap::new();
        for spec in self.attributes() {
            if let Some(attr) = wire.get(spec.name()) {
                values.insert(spec.name().to_owned(), spec.deserialize(attr)?);
            }
        }
        Ok(Item {
            model: self.name().to_owned(),
            values,
        })
    }

    /// Decode a point-lookup response, failing with
    /// [`MapperError::NotFound`] when the store returned no item.
    pub fn item_from_get_output(
        &self,
        request: &GetItemInput,
        output: GetItemOutput,
    ) -> MapperResult<Item> {
        match output.item {
            Some(wire) => self.item_from_wire(&wire),
            None => Err(MapperError::NotFound {
                table: request.table_name.clone(),
                key: render_key(&request.key),
            }),
        }
    }

    /// Decode one page of a query response.
    pub fn page_from_query_output(&self, output: QueryOutput) -> MapperResult<Page> {
        let items = output
            .items
            .iter()
            .map(|wire| self.item_from_wire(wire))
            .collect::<MapperResult<Vec<_>>>()?;
        let cursor = (!output.last_evaluated_key.is_empty()).then_some(output.last_evaluated_key);
        Ok(Page { items, cursor })
    }
}

/// `{hk=#WORKORDER, sk=#ORG:1}` with names sorted.
fn render_key(key: &Key) -> String {
    let mut parts: Vec<_> = key
        .iter()
        .map(|(k, v)| match v.as_s().or_else(|| v.as_n()) {
            Some(scalar) => format!("{k}={scalar}"),
            None => format!("{k}={v}"),
        })
        .collect();
    parts.sort();
    format!("{{{}}}", parts.join(", "))
}
