// src/frame/mod.rs

//! Tabular data model.
//!
//! - [`value`] holds scalar values, logical types and cast rules.
//! - [`schema`] describes columns.
//! - [`dataset`] is the immutable table type and its relational operations.
//! - [`json`] reads JSON sources with schema inference.

pub mod dataset;
pub mod json;
pub mod schema;
pub mod value;

pub use dataset::{Dataset, Row};
pub use json::{read_json, JsonReadOptions};
pub use schema::{Field, Schema};
pub use value::{DataType, Value};
