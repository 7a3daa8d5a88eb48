//! Sender profile and per-recipient personalization.

use std::sync::OnceLock;

use regex::Regex;

/// The placeholder the draft carries until send time.
pub const COMPANY_PLACEHOLDER: &str = "[Recipient's Company]";

/// The outreach sender's identity and transport credential, collected by the
/// conversational flow. The credential is handed to the mail transport and
/// never logged.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderProfile {
    pub email: String,
    pub phone: String,
    pub credential: String,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").unwrap())
}

/// Whether the string is a plausible email address.
pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email.trim())
}

/// Substitute the recipient's company name into a draft.
pub fn personalize(html: &str, company: &str) -> String {
    html.replace(COMPANY_PLACEHOLDER, company)
}
