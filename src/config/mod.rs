// src/config/mod.rs

//! Pipeline definitions.
//!
//! - `model.rs` holds the TOML-backed data model and the builder API.
//! - `loader.rs` reads a definition from disk.
//! - `validate.rs` turns a `RawConfigFile` into a validated `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ExpectationConfig, PipelineSection, RawConfigFile, ReadConfig, StepConfig,
    TableConfig,
};
