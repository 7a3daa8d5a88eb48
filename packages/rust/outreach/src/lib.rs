//! Outreach flows for LeadScout.
//!
//! This crate provides:
//! - [`fsm`] — the multi-step conversational flows as explicit typed state
//!   machines ([`OutreachFlow`] for cold outreach, [`ReplyFlow`] for
//!   answering inbound inquiries)
//! - [`compose`] — sender profile, email validation, and per-recipient
//!   personalization
//! - [`send`] — recipient extraction from the exported table, the
//!   [`EmailTransport`] seam, and the batch send
//!
//! Drafting stays in `leadscout-llm` and the actual mail carrier stays
//! outside the crate; everything here is deterministic and testable without
//! a network.

pub mod compose;
pub mod fsm;
pub mod send;

pub use compose::{COMPANY_PLACEHOLDER, SenderProfile, is_valid_email, personalize};
pub use fsm::{Action, OutreachFlow, ReplyAction, ReplyFlow, Step};
pub use send::{
    EmailTransport, OutboundEmail, Recipient, SendReport, recipients_from_table, send_batch,
};
