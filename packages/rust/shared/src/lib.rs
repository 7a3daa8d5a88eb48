//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`] — the unified error type
//! - Domain types ([`SourceTag`], [`RawRecord`], [`NormalizedRecord`], [`ResultSet`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, LlmConfig, MapsConfig, OutreachConfig, ReviewsConfig, SinkConfig,
    SpreadsheetConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    Field, MapsRaw, Normalized, NormalizedRecord, Provenance, RawRecord, ResultSet, ReviewFilter,
    ReviewRaw, SourceTag, TaggedRecord, UNKNOWN, Verification,
};
