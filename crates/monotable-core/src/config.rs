//! Mapper configuration.
//!
//! [`MonotableConfig`] is loaded from `MONOTABLE_*` environment variables via
//! [`MonotableConfig::from_env`]; every field has a default.

use std::env;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{MapperError, MapperResult};
use crate::schema::PRIMARY_INDEX;

/// Runtime settings shared by request builders and the CLI.
///
/// ```
/// use monotable_core::MonotableConfig;
///
/// let config = MonotableConfig::builder().consistent_read(Some(true)).build();
/// assert_eq!(config.default_index, "primary");
/// assert_eq!(config.log_level, "info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct MonotableConfig {
    /// Overrides the table name declared in the schema.
    #[builder(default)]
    pub table_name: Option<String>,

    /// Index used when a query names none.
    #[builder(default = String::from(PRIMARY_INDEX))]
    pub default_index: String,

    /// Read mode applied when a request leaves it unset.
    #[builder(default)]
    pub consistent_read: Option<bool>,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for MonotableConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            default_index: String::from(PRIMARY_INDEX),
            consistent_read: None,
            log_level: String::from("info"),
        }
    }
}

impl MonotableConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `MONOTABLE_TABLE_NAME` | schema table name |
    /// | `MONOTABLE_DEFAULT_INDEX` | `primary` |
    /// | `MONOTABLE_CONSISTENT_READ` | unset |
    /// | `MONOTABLE_LOG_LEVEL` | `info` |
    pub fn from_env() -> MapperResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`MonotableConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MapperResult<Self> {
        let defaults = Self::default();
        let config = Self {
            table_name: lookup("MONOTABLE_TABLE_NAME").filter(|v| !v.is_empty()),
            default_index: lookup("MONOTABLE_DEFAULT_INDEX").unwrap_or(defaults.default_index),
            consistent_read: lookup("MONOTABLE_CONSISTENT_READ")
                .map(|v| parse_bool("MONOTABLE_CONSISTENT_READ", &v))
                .transpose()?,
            log_level: lookup("MONOTABLE_LOG_LEVEL").unwrap_or(defaults.log_level),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no request could use.
    pub fn validate(&self) -> MapperResult<()> {
        if self.default_index.is_empty() {
            return Err(MapperError::Config(
                "default index name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> MapperResult<bool> {
    match value {
        "1" | "true" | "yes" | "TRUE" | "YES" => Ok(true),
        "0" | "false" | "no" | "FALSE" | "NO" => Ok(false),
        other => Err(MapperError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}
