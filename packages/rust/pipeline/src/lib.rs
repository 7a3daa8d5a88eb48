//! The LeadScout result pipeline: normalization, aggregation, and the
//! end-to-end search flow.
//!
//! This crate provides:
//! - [`normalize`] — raw record → canonical record, with best-effort
//!   degradation for unrecognized shapes
//! - [`aggregate`] — ordered, source-tagged collection of one query's results
//! - [`run`] — the `search` pipeline: expand → scrape → aggregate → export

pub mod aggregate;
pub mod normalize;
pub mod run;

pub use aggregate::aggregate;
pub use normalize::normalize;
pub use run::{
    ExportTargets, LeadSearchConfig, LeadSearchOutcome, ProgressReporter, SearchClients,
    SearchReport, SilentProgress, run_lead_search,
};
