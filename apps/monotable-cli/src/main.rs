//! Monotable CLI - resolve items and print the store requests they produce.
//!
//! The binary never contacts a store. Each command loads a schema
//! definition, runs the mapper, and prints the request as JSON.
//!
//! # Usage
//!
//! ```text
//! monotable schema.json item values.json
//! monotable schema.json key values.json
//! monotable schema.json query '#WORKORDER' --index by_task --limit 10
//! monotable schema.json create-table
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MONOTABLE_SCHEMA` | *(unset)* | Schema file when no path is given |
//! | `MONOTABLE_TABLE_NAME` | schema table | Table name override |
//! | `MONOTABLE_DEFAULT_INDEX` | `primary` | Index queried when `--index` is absent |
//! | `MONOTABLE_CONSISTENT_READ` | *(unset)* | Default read mode |
//! | `MONOTABLE_LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `MONOTABLE_LOG_LEVEL`) |

mod definition;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use monotable_core::{
    ConditionExpressionBuilder, MonotableConfig, QueryRequest, ScanDirection, Value,
};

use crate::definition::SchemaDefinition;

#[derive(Debug, Parser)]
#[command(name = "monotable", about = "Single-table item mapper", version)]
struct Cli {
    /// Path to the schema definition file
    #[arg(env = "MONOTABLE_SCHEMA")]
    schema: PathBuf,

    /// Table name, overriding the schema and MONOTABLE_TABLE_NAME
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an item and print its PutItem request
    Item {
        /// JSON object of field values
        values: PathBuf,
    },

    /// Resolve an item and print the GetItem request for its key
    Key {
        /// JSON object of field values
        values: PathBuf,
    },

    /// Print a Query request
    Query {
        /// Value the index hash key must equal
        hash_key: String,

        /// Index to query
        #[arg(long)]
        index: Option<String>,

        /// Maximum number of items to evaluate
        #[arg(long)]
        limit: Option<u32>,

        /// Prefix the index sort key must start with
        #[arg(long)]
        begins_with: Option<String>,

        /// Return items in descending sort-key order
        #[arg(long)]
        descending: bool,
    },

    /// Print the CreateTable request
    CreateTable,

    /// Print the DeleteTable request
    DeleteTable,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the configured log level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    Ok(())
}

fn load_values(path: &Path) -> Result<HashMap<String, Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read values file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| {
        format!(
            "values file {} must be a JSON object of strings and integers",
            path.display()
        )
    })
}

fn to_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to encode request")
}

/// Execute one command and return the JSON it prints.
fn run(cli: Cli, mut config: MonotableConfig) -> Result<String> {
    if let Some(table) = cli.table {
        config.table_name = Some(table);
    }
    let (model, table) = SchemaDefinition::load(&cli.schema)?.into_schemas()?;
    let builder = ConditionExpressionBuilder::with_config(&table, &config);
    info!(
        model = model.name(),
        table = builder.table_name(),
        "loaded schema"
    );

    match cli.command {
        Command::Item { values } => {
            let item = model.create(load_values(&values)?)?;
            to_json(&builder.build_put_request(&model, &item)?)
        }
        Command::Key { values } => {
            let item = model.create(load_values(&values)?)?;
            let primary = table.primary();
            let hash = item
                .get(primary.hash_key().name())
                .cloned()
                .ok_or_else(|| anyhow!("hash key '{}' has no value", primary.hash_key().name()))?;
            let sort = primary
                .sort_key()
                .and_then(|spec| item.get(spec.name()).cloned());
            to_json(&builder.build_get_request(hash, sort)?)
        }
        Command::Query {
            hash_key,
            index,
            limit,
            begins_with,
            descending,
        } => {
            let target = table.index(Some(index.as_deref().unwrap_or(&config.default_index)))?;
            let key_condition = match (target.sort_key(), begins_with) {
                (Some(sort), Some(prefix)) => Some(sort.begins_with(prefix)?),
                (None, Some(_)) => {
                    return Err(anyhow!(
                        "--begins-with needs an index with a sort key, '{}' has none",
                        target.name()
                    ));
                }
                (_, None) => None,
            };
            let request = QueryRequest {
                hash_key_value: Value::from(hash_key),
                key_condition,
                filter_condition: None,
                limit,
                index_name: index,
                select: None,
                consistent_read: None,
                scan_direction: descending.then_some(ScanDirection::Backward),
                pagination_cursor: None,
                projection: Vec::new(),
            };
            to_json(&builder.build_request(request)?)
        }
        Command::CreateTable => {
            let mut input = table.create_table_input();
            input.table_name = builder.table_name().to_owned();
            to_json(&input)
        }
        Command::DeleteTable => {
            let mut input = table.delete_table_input();
            input.table_name = builder.table_name().to_owned();
            to_json(&input)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MonotableConfig::from_env()?;
    init_tracing(&config.log_level)?;

    let output = run(cli, config)?;
    println!("{output}");
    Ok(())
}
