//! Chat-model assistance for LeadScout.
//!
//! This crate provides:
//! - [`ChatClient`] — a minimal OpenAI-compatible chat-completions client
//! - [`expand`] — user query → diverse search queries, and query →
//!   structured review-site filter
//! - [`draft`] — outreach email drafting (subject + HTML body)
//!
//! The model is strictly a text assistant here: it expands, extracts, and
//! drafts. It never decides what gets scraped or sent.

pub mod client;
pub mod draft;
pub mod expand;

pub use client::ChatClient;
pub use draft::{Draft, draft_outreach, draft_reply};
pub use expand::{expand_queries, parse_review_filter};
