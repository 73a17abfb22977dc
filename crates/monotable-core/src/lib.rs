//! Monotable core: typed attributes, condition expressions, and template
//! resolution for single-table item models.
//!
//! The crate never talks to the store. It turns caller values into fully
//! resolved items, serializes them into wire items, and prepares the
//! `PutItem` / `GetItem` / `Query` inputs a persistence layer sends.
//!
//! ```
//! use monotable_core::{AttributeSpec, ModelSchema, Value};
//!
//! let model = ModelSchema::builder("Workorder")
//!     .attribute(AttributeSpec::string("hk").template("#WORKORDER"))
//!     .attribute(AttributeSpec::string("sk").template("#ORG:${org_id}#WORKORDER:${workorder_id}"))
//!     .attribute(AttributeSpec::integer("org_id").required())
//!     .attribute(AttributeSpec::integer("workorder_id").required())
//!     .build()
//!     .unwrap();
//!
//! let item = model.create([("org_id", 123), ("workorder_id", 456)]).unwrap();
//! assert_eq!(item.get("sk"), Some(&Value::from("#ORG:123#WORKORDER:456")));
//! ```
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod codec;
pub mod condition;
pub mod config;
pub mod error;
pub mod item;
pub mod request;
pub mod schema;
pub mod template;

pub use codec::{AttributeKind, ComparisonOp, Value};
pub use condition::{Condition, LogicalOp};
pub use config::MonotableConfig;
pub use error::{MapperError, MapperResult};
pub use item::{Item, Page};
pub use request::{ConditionExpressionBuilder, QueryRequest, ScanDirection};
pub use schema::{
    AttributeSpec, IndexDescriptor, IndexType, ModelSchema, ModelSchemaBuilder, PRIMARY_INDEX,
    TableSchema, TableSchemaBuilder,
};
pub use template::{ResolvedValues, Template, TemplateResolver};
