//! Composable condition expressions.
//!
//! A [`Condition`] is an expression fragment plus the values bound to its
//! placeholders. Conditions are combined with [`Condition::and`] and
//! [`Condition::or`]; both consume their operands and return a new value.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::warn;
use uuid::Uuid;

use monotable_model::{AttributeValue, ExpressionAttributeValues};

/// Boolean operator joining two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// Both sides must hold.
    And,
    /// Either side must hold.
    Or,
}

impl LogicalOp {
    /// Keyword used in the expression string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns a placeholder that no other call will ever return.
pub(crate) fn fresh_placeholder() -> String {
    format!(":{}", Uuid::new_v4().simple())
}

/// An expression fragment with its placeholder bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    expression: String,
    parameters: ExpressionAttributeValues,
    /// Operator at the top level of `expression`, `None` for a single comparison.
    joined_by: Option<LogicalOp>,
    /// Placeholders that were bound to two different values while combining.
    collisions: BTreeSet<String>,
}

impl Condition {
    pub(crate) fn bound(expression: String, placeholder: String, value: AttributeValue) -> Self {
        Self {
            expression,
            parameters: HashMap::from([(placeholder, value)]),
            joined_by: None,
            collisions: BTreeSet::new(),
        }
    }

    /// The expression string, e.g. `hk = :a1b2 AND begins_with(sk, :c3d4)`.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Placeholder to wire-value bindings.
    #[must_use]
    pub fn parameters(&self) -> &ExpressionAttributeValues {
        &self.parameters
    }

    /// Placeholders bound to conflicting values. Always empty for conditions
    /// built by this crate; non-empty means a defect upstream.
    #[must_use]
    pub fn collisions(&self) -> &BTreeSet<String> {
        &self.collisions
    }

    /// Splits into the expression and its bindings.
    #[must_use]
    pub fn into_parts(self) -> (String, ExpressionAttributeValues) {
        (self.expression, self.parameters)
    }

    /// Both `self` and `other` must hold.
    #[must_use]
    pub fn and(self, other: Condition) -> Condition {
        self.combine(LogicalOp::And, other)
    }

    /// Either `self` or `other` must hold.
    #[must_use]
    pub fn or(self, other: Condition) -> Condition {
        self.combine(LogicalOp::Or, other)
    }

    fn combine(self, op: LogicalOp, other: Condition) -> Condition {
        let expression = format!(
            "{} {op} {}",
            self.operand_for(op),
            other.operand_for(op)
        );

        let mut parameters = self.parameters;
        let mut collisions = self.collisions;
        collisions.extend(other.collisions);
        for (placeholder, value) in other.parameters {
            if let Some(existing) = parameters.get(&placeholder) {
                if *existing != value {
                    warn!(%placeholder, "placeholder bound to two different values");
                    collisions.insert(placeholder.clone());
                }
            }
            parameters.insert(placeholder, value);
        }

        Condition {
            expression,
            parameters,
            joined_by: Some(op),
            collisions,
        }
    }

    /// Wraps a compound expression in parentheses when it is joined by a
    /// different operator than the one it is being combined with.
    fn operand_for(&self, op: LogicalOp) -> Cow<'_, str> {
        match self.joined_by {
            Some(inner) if inner != op => Cow::Owned(format!("({})", self.expression)),
            _ => Cow::Borrowed(&self.expression),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
