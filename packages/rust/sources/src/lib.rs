//! Source adapters for LeadScout.
//!
//! This crate provides:
//! - [`maps`] — the maps/places listing adapter (API search + detail lookup
//!   + per-website email scan)
//! - [`reviews`] — the review-site directory adapter (category resolution +
//!   paginated HTML scrape)
//! - [`emailscan`] — contact-email harvesting from company websites
//!
//! Adapters never let a failure cross their boundary: individual fetch or
//! parse failures skip the item, total upstream failures yield an empty
//! batch with the cause logged.

pub mod emailscan;
pub mod maps;
pub mod reviews;

pub use emailscan::{extract_emails, scan_for_emails};
pub use maps::MapsClient;
pub use reviews::ReviewSiteClient;
