//! Outreach email drafting.
//!
//! Two model calls per draft: one for the body (paragraph prose with
//! `[Recipient's Company]` placeholders), one for a short subject line. The
//! body is wrapped in a fixed header/content/footer HTML scaffold carrying
//! the sender's contact details, so the model never writes contact info
//! itself.

use tracing::instrument;

use leadscout_shared::Result;

use crate::client::ChatClient;

const BODY_SYSTEM: &str =
    "You are a skilled email writer. Create a professional business email based on the user's \
     provided theme. The email should be concise, polite, and aimed at establishing a \
     professional relationship. Use a formal tone, with a greeting to [Recipient's Company] team \
     and clear paragraphs separated by two newlines. Use only the placeholder \
     [Recipient's Company]; never [Recipient's Name]. Don't write contact information.";

const SUBJECT_SYSTEM: &str =
    "You are a skilled email writer. Based on the provided theme, generate a suitable and \
     concise email subject line. The subject should be clear, engaging, and relevant. Keep it \
     short, ideally within 60 characters.";

const REPLY_SYSTEM: &str =
    "Create a professional and polite response to the following inquiry. Don't use placeholders. \
     Ensure that each paragraph is separated by a blank line for clear readability. Don't write \
     contact information.";

/// A generated outreach draft. The HTML still contains the
/// `[Recipient's Company]` placeholder; personalization happens per
/// recipient at send time.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub subject: String,
    pub html: String,
}

/// Generate an outreach draft for the given theme.
#[instrument(skip_all, fields(theme_len = theme.len()))]
pub async fn draft_outreach(
    client: &ChatClient,
    theme: &str,
    sender_email: &str,
    sender_phone: &str,
) -> Result<Draft> {
    let user = format!("Theme: {theme}. Please include a placeholder for the recipient's company.");
    let body = client.chat(BODY_SYSTEM, &user, Some(600)).await?;
    let body = strip_html_fences(&body);

    let subject = client
        .chat(SUBJECT_SYSTEM, &format!("Theme: {theme}"), Some(60))
        .await?;

    let html = wrap_scaffold(&subject, body, sender_email, sender_phone);
    Ok(Draft { subject, html })
}

/// Generate a reply draft for an inbound inquiry. Returns paragraph HTML
/// without the scaffold (replies reuse the inquiry's thread context).
pub async fn draft_reply(client: &ChatClient, inquiry: &str) -> Result<String> {
    let content = client.chat(REPLY_SYSTEM, inquiry, Some(300)).await?;
    Ok(paragraphs_to_html(&content))
}

/// Remove ```html fences the model sometimes wraps its answer in.
fn strip_html_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```html")
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

/// Wrap blank-line-separated prose into `<p>` elements.
fn paragraphs_to_html(content: &str) -> String {
    content
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{p}</p>"))
        .collect()
}

/// The fixed email scaffold: header with the subject, body paragraphs,
/// footer with the sender's contact details.
fn wrap_scaffold(header: &str, body: &str, sender_email: &str, sender_phone: &str) -> String {
    let formatted = paragraphs_to_html(body);
    format!(
        r#"<html>
<head>
  <style>
    body {{ font-family: Arial, sans-serif; }}
    .header {{ background-color: #f8f8f8; padding: 10px; text-align: center; border-bottom: 1px solid #ddd; }}
    .content {{ padding: 20px; }}
    .footer {{ padding: 10px; text-align: center; border-top: 1px solid #ddd; margin-top: 20px; }}
  </style>
</head>
<body>
  <div class="header"><h1>{header}</h1></div>
  <div class="content">{formatted}</div>
  <div class="footer">
    <p>Phone: {sender_phone}</p>
    <p>Email: {sender_email}</p>
  </div>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn paragraphs_wrap_and_skip_blanks() {
        let html = paragraphs_to_html("First paragraph.\n\n\n\nSecond one.");
        assert_eq!(html, "<p>First paragraph.</p><p>Second one.</p>");
    }

    #[test]
    fn scaffold_carries_sender_contact() {
        let html = wrap_scaffold("Hello", "Body text.", "me@example.com", "555-0100");
        assert!(html.contains("<h1>Hello</h1>"));
        assert!(html.contains("<p>Body text.</p>"));
        assert!(html.contains("Phone: 555-0100"));
        assert!(html.contains("Email: me@example.com"));
    }

    #[test]
    fn html_fences_are_stripped() {
        assert_eq!(strip_html_fences("```html\n<p>x</p>\n```"), "<p>x</p>");
        assert_eq!(strip_html_fences("<p>x</p>"), "<p>x</p>");
    }

    #[tokio::test]
    async fn reply_wraps_paragraphs_without_scaffold() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant",
                    "content": "Thanks for reaching out.\n\nWe will follow up shortly."}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri(), "k", "m").unwrap();
        let html = draft_reply(&client, "Can you tell me about pricing?")
            .await
            .unwrap();
        assert_eq!(
            html,
            "<p>Thanks for reaching out.</p><p>We will follow up shortly.</p>"
        );
        assert!(!html.contains("footer"));
    }

    #[tokio::test]
    async fn draft_combines_subject_and_scaffolded_body() {
        let server = MockServer::start().await;
        // Same canned completion serves both the body and subject calls.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant",
                    "content": "Dear [Recipient's Company] team,\n\nWe would love to work with you."}}]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(server.uri(), "k", "m").unwrap();
        let draft = draft_outreach(&client, "partnership", "me@example.com", "555-0100")
            .await
            .unwrap();

        assert!(draft.html.contains("[Recipient's Company]"));
        assert!(draft.html.contains("me@example.com"));
        assert!(!draft.subject.is_empty());
    }
}
