//! `${field}` templates and their fixed-point resolution.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::codec::Value;
use crate::error::{MapperError, MapperResult};
use crate::schema::AttributeSpec;

/// Field name to value after resolution.
pub type ResolvedValues = HashMap<String, Value>;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template string.
///
/// Text substituted for a placeholder becomes a literal segment, so a value
/// that itself contains `${...}` is never expanded again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split `source` into literal text and `${name}` placeholders.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_owned()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_owned()));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_owned()));
        }
        Self { segments }
    }

    /// Names still referenced by the template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether no placeholders remain.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.placeholders().next().is_none()
    }

    /// Replace every placeholder whose value is known with its natural
    /// string form.
    pub fn substitute(&mut self, known: &HashMap<String, Value>) {
        for segment in &mut self.segments {
            if let Segment::Placeholder(name) = segment {
                if let Some(value) = known.get(name.as_str()) {
                    *segment = Segment::Literal(value.to_string());
                }
            }
        }
    }

    /// The rendered string, once no placeholders remain.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Placeholder(_) => None,
            })
            .collect()
    }

    fn unresolved<'a>(
        &'a self,
        known: &'a HashMap<String, Value>,
    ) -> impl Iterator<Item = &'a str> {
        self.placeholders().filter(|name| !known.contains_key(*name))
    }
}

/// Resolves templated fields from caller-supplied values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver;

impl TemplateResolver {
    /// Produce the complete value map for one item.
    ///
    /// Caller values win over templates and defaults. A default applies to a
    /// field without a caller value and without a template. Templated fields
    /// are resolved in rounds: each round picks the pending fields with the
    /// fewest unknown references, substitutes what is known, and promotes
    /// those left without references. A round that promotes nothing fails
    /// with [`MapperError::CyclicTemplate`].
    ///
    /// Either the full map is returned or an error; partial results are
    /// never exposed.
    pub fn resolve(
        specs: &[AttributeSpec],
        values: HashMap<String, Value>,
    ) -> MapperResult<ResolvedValues> {
        let mut resolved = values;
        let mut pending: BTreeMap<&str, Template> = BTreeMap::new();
        let mut missing = Vec::new();

        for spec in specs {
            if resolved.contains_key(spec.name()) {
                continue;
            }
            match (spec.template_str(), spec.default()) {
                (Some(template), _) => {
                    pending.insert(spec.name(), Template::parse(template));
                }
                (None, Some(default)) => {
                    resolved.insert(spec.name().to_owned(), default.clone());
                }
                (None, None) if spec.is_required() => missing.push(spec.name().to_owned()),
                (None, None) => {}
            }
        }
        if !missing.is_empty() {
            return Err(MapperError::RequiredFieldMissing { fields: missing });
        }

        // Every productive round promotes at least one field.
        let max_rounds = pending.len();
        for round in 0..max_rounds {
            let Some(min) = pending
                .values()
                .map(|t| t.unresolved(&resolved).count())
                .min()
            else {
                break;
            };

            let selected: Vec<&str> = pending
                .iter()
                .filter(|(_, t)| t.unresolved(&resolved).count() == min)
                .map(|(name, _)| *name)
                .collect();

            let mut promoted = Vec::new();
            for name in selected {
                let Some(template) = pending.get_mut(name) else {
                    continue;
                };
                template.substitute(&resolved);
                if let Some(rendered) = template.render() {
                    promoted.push((name, rendered));
                }
            }

            trace!(round, min, promoted = promoted.len(), "template resolution round");
            if promoted.is_empty() {
                break;
            }
            for (name, rendered) in promoted {
                pending.remove(name);
                resolved.insert(name.to_owned(), Value::String(rendered));
            }
        }

        if pending.is_empty() {
            return Ok(resolved);
        }
        let known = &resolved;
        let references: BTreeSet<String> = pending
            .values()
            .flat_map(move |t| t.unresolved(known))
            .map(str::to_owned)
            .collect();
        Err(MapperError::CyclicTemplate {
            fields: pending.keys().map(|name| (*name).to_owned()).collect(),
            references: references.into_iter().collect(),
        })
    }
}
