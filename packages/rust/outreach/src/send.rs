//! Recipient extraction and batch sending.
//!
//! Recipients come from the exported 8-column companies table: any row with
//! a company name and at least one valid contact email yields one recipient
//! (first email wins). The mail transport itself stays behind the
//! [`EmailTransport`] seam; per-recipient failures are tallied, never fatal.

use tracing::{info, warn};

use leadscout_llm::Draft;
use leadscout_shared::Result;

use crate::compose::{is_valid_email, personalize};

/// One outreach target extracted from the exported table.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub company: String,
    pub email: String,
}

/// A personalized email ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Delivery seam. SMTP (or whatever carries the mail) lives behind this.
#[async_trait::async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

/// Tally of one batch send.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Recipient extraction
// ---------------------------------------------------------------------------

/// Extract recipients from the exported companies table.
///
/// Expects the 8-column quoted CSV the tabular exporter renders. Rows
/// shorter than three columns, rows without a company name, and rows whose
/// email column holds no valid address are skipped.
pub fn recipients_from_table(csv: &str) -> Vec<Recipient> {
    let mut recipients = Vec::new();

    for line in csv.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields = parse_quoted_row(line);
        if fields.len() < 3 {
            warn!(columns = fields.len(), "incomplete row, skipping");
            continue;
        }

        let company = fields[0].trim();
        if company.is_empty() {
            continue;
        }

        // The email column is comma-joined at export time; the first valid
        // address wins. The unknown sentinel never validates.
        let Some(email) = fields[2].split(',').map(str::trim).find(|e| is_valid_email(e))
        else {
            continue;
        };

        recipients.push(Recipient {
            company: company.to_string(),
            email: email.to_string(),
        });
    }

    recipients
}

/// Split one fully-quoted CSV line into fields, unescaping doubled quotes.
fn parse_quoted_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

// ---------------------------------------------------------------------------
// Batch send
// ---------------------------------------------------------------------------

/// Personalize the draft for each recipient and send through the transport.
///
/// A failed send is logged and tallied; the batch always runs to the end.
pub async fn send_batch(
    transport: &dyn EmailTransport,
    draft: &Draft,
    recipients: &[Recipient],
) -> SendReport {
    let mut report = SendReport::default();

    for recipient in recipients {
        let email = OutboundEmail {
            to: recipient.email.clone(),
            subject: draft.subject.clone(),
            html: personalize(&draft.html, &recipient.company),
        };

        match transport.send(&email).await {
            Ok(()) => {
                info!(to = %recipient.email, company = %recipient.company, "email sent");
                report.sent += 1;
            }
            Err(e) => {
                warn!(to = %recipient.email, error = %e, "send failed");
                report.failed += 1;
            }
        }
    }

    info!(sent = report.sent, failed = report.failed, "batch complete");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use leadscout_shared::LeadScoutError;

    const TABLE: &str = "\"Company Name\",\"Website\",\"Emails/Contact Info\",\"Phone\",\"Location\",\"Rating\",\"Reviews\",\"Verification\"\r\n\
        \"Acme \"\"The Drill\"\", Inc.\",\"https://acme.example\",\"a@acme.example, b@acme.example\",\"512\",\"Austin, TX\",\"N/A\",\"42\",\"N/A\"\r\n\
        \"No Contact Co\",\"https://quiet.example\",\"N/A\",\"N/A\",\"N/A\",\"4.0\",\"3\",\"False\"\r\n\
        \"Short Row\"\r\n\
        \"Lowkey\",\"https://lowkey.example\",\"hi@lowkey.example\",\"151\",\"Austin\",\"4.6\",\"20\",\"True\"\r\n";

    #[test]
    fn quoted_row_parsing_handles_escapes_and_commas() {
        let fields = parse_quoted_row(r#""Acme ""The Drill"", Inc.","a, b","x""#);
        assert_eq!(fields, vec![r#"Acme "The Drill", Inc."#, "a, b", "x"]);
    }

    #[test]
    fn recipients_take_first_valid_email_and_skip_bad_rows() {
        let recipients = recipients_from_table(TABLE);
        assert_eq!(
            recipients,
            vec![
                Recipient {
                    company: r#"Acme "The Drill", Inc."#.into(),
                    email: "a@acme.example".into(),
                },
                Recipient {
                    company: "Lowkey".into(),
                    email: "hi@lowkey.example".into(),
                },
            ]
        );
    }

    #[test]
    fn header_only_table_yields_no_recipients() {
        let header = TABLE.lines().next().unwrap();
        assert!(recipients_from_table(header).is_empty());
    }

    /// Transport that records sends and rejects one address.
    struct FlakyTransport {
        reject: String,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    #[async_trait::async_trait]
    impl EmailTransport for FlakyTransport {
        async fn send(&self, email: &OutboundEmail) -> leadscout_shared::Result<()> {
            if email.to == self.reject {
                return Err(LeadScoutError::Network("connection refused".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn batch_personalizes_and_tallies_failures() {
        let transport = FlakyTransport {
            reject: "hi@lowkey.example".into(),
            sent: Mutex::new(Vec::new()),
        };
        let draft = Draft {
            subject: "Partnership".into(),
            html: "<p>Dear [Recipient's Company] team,</p>".into(),
        };
        let recipients = recipients_from_table(TABLE);

        let report = send_batch(&transport, &draft, &recipients).await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@acme.example");
        assert!(sent[0].html.contains(r#"Acme "The Drill", Inc."#));
        assert!(!sent[0].html.contains("[Recipient's Company]"));
    }
}
