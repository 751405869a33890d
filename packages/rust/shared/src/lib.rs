//! Shared types, error model, and configuration for tabledown.
//!
//! This crate is the foundation depended on by all other tabledown crates.
//! It provides:
//! - [`TabledownError`] — the unified error type
//! - Domain types ([`RawRecord`], [`Metadata`], [`SchemaKind`], [`RenderedDocument`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, NamingConfig, OutputConfig, PipelineConfig, SniffConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{Result, TabledownError};
pub use types::{Metadata, RawRecord, RenderedDocument, SchemaKind};
