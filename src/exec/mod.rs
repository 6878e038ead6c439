// src/exec/mod.rs

//! Table execution layer.
//!
//! - [`materialize`] reads a table's input, applies its steps and
//!   expectations, and registers the result.
//! - [`table_runner`] runs one materialization on the blocking pool and
//!   reports back to the runtime.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production, which tests can replace with
//!   a fake implementation.

pub mod backend;
pub mod materialize;
pub mod table_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use materialize::{materialize_table, MaterializeContext};
