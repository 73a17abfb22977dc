//! Wire types for the single-table store behind Monotable.
//!
//! Everything in this crate mirrors the store's JSON protocol: typed
//! attribute envelopes, key schema elements, and the handful of request and
//! response shapes the mapper prepares or decodes. The mapper never sends
//! these itself; a persistence layer does.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod input;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use types::{ExpressionAttributeValues, Item, Key};
