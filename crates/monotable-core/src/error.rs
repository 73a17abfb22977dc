//! Error taxonomy for the mapper.

/// Errors raised while resolving, serializing, or preparing requests.
///
/// Every variant carries the offending field, index, or placeholder names so
/// callers can report them without extra context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapperError {
    /// Required fields have no value, no default, and no template.
    #[error("required field(s) missing: {}", .fields.join(", "))]
    RequiredFieldMissing {
        /// Names of the missing fields.
        fields: Vec<String>,
    },

    /// A request targets an index, or key, that the table does not define.
    #[error("schema error: {message}")]
    Schema {
        /// Explanation.
        message: String,
    },

    /// Template fields could not be resolved: a reference cycle, or a
    /// reference to a field that was never provided.
    #[error(
        "cannot resolve template field(s) {}: unresolved reference(s) {}",
        .fields.join(", "),
        .references.join(", ")
    )]
    CyclicTemplate {
        /// Fields whose templates are still incomplete.
        fields: Vec<String>,
        /// Placeholder names that never became known.
        references: Vec<String>,
    },

    /// A value does not coerce to the field's declared kind.
    #[error("type mismatch on field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        /// The field being serialized or decoded; empty when unknown.
        field: String,
        /// The declared kind.
        expected: &'static str,
        /// What was actually supplied.
        found: String,
    },

    /// A point lookup returned no item.
    #[error("no item in table '{table}' for key {key}")]
    NotFound {
        /// Table that was read.
        table: String,
        /// Rendered primary key.
        key: String,
    },

    /// Two conditions bound the same placeholder to different values.
    #[error("placeholder {placeholder} is bound to two different values")]
    PlaceholderCollision {
        /// The colliding placeholder.
        placeholder: String,
    },

    /// A value was supplied for a field the model does not declare.
    #[error("model '{model}' has no field '{field}'")]
    UnknownField {
        /// The model name.
        model: String,
        /// The undeclared field.
        field: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MapperError {
    /// Build a [`MapperError::Schema`].
    #[must_use]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Attach a field name to a [`MapperError::TypeMismatch`] raised by a
    /// bare attribute kind. Other variants pass through unchanged.
    #[must_use]
    pub fn for_field(self, name: &str) -> Self {
        match self {
            Self::TypeMismatch {
                field,
                expected,
                found,
            } if field.is_empty() => Self::TypeMismatch {
                field: name.to_owned(),
                expected,
                found,
            },
            other => other,
        }
    }
}

/// Convenience result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;
