//! Export surfaces for LeadScout result sets.
//!
//! This crate provides:
//! - [`table`] — the flat 8-column tabular projection and its quoted-CSV
//!   rendering
//! - [`sink`] — the [`DocumentSink`] delivery seam and its HTTP
//!   implementation
//! - [`sheet`] — the narrower 6-column spreadsheet projection and the
//!   [`SpreadsheetClient`] that persists it
//!
//! Both exporters walk the same immutable [`leadscout_shared::ResultSet`]
//! independently; a failure in one never affects the other.

pub mod sheet;
pub mod sink;
pub mod table;

pub use sheet::{SHEET_HEADER, SpreadsheetClient, export_to_spreadsheet, to_sheet_rows};
pub use sink::{DocumentSink, HttpDocumentSink};
pub use table::{TABLE_HEADER, render_csv, to_table};
