//! Contact-email harvesting from company websites.
//!
//! A raw regex sweep over page HTML picks up plenty of `@`-shaped noise:
//! bundler artifacts, image-density filenames (`logo@2x.png`), telemetry
//! hosts, version strings. The ignore list below drops those before the
//! result leaves this module.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// Email-shaped token matcher.
fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]{2,}\b").unwrap()
    })
}

/// Patterns for `@`-shaped tokens that are not contact addresses.
fn ignore_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            // Telemetry and CDN hosts that show up in inlined scripts.
            r"sentry\..+",
            r"wixpress\.com",
            r"polyfill\.io",
            // Package names pinned to versions: lodash@4.17.21 etc.
            r"\b[a-zA-Z0-9_.+-]+@[0-9]+\.[0-9]+\.[0-9]+\b",
            // Image-density asset filenames: logo@2x.png, hero@3x-640x480.png.webp.
            r"@[0-9]+x(\b|[0-9-])",
            r"@\w*\.(png|jpe?g|gif|webp|svg)",
            // Machine-generated locals with long digit runs.
            r"@[a-zA-Z0-9]*[0-9]{5,}@",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    })
}

/// Extract contact emails from page HTML, in first-seen order, deduplicated,
/// with asset/artifact matches dropped.
pub fn extract_emails(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut emails = Vec::new();

    for m in email_re().find_iter(html) {
        let candidate = m.as_str();
        if ignore_res().iter().any(|re| re.is_match(candidate)) {
            continue;
        }
        if seen.insert(candidate.to_lowercase()) {
            emails.push(candidate.to_string());
        }
    }

    emails
}

/// Fetch a company website and harvest contact emails from its HTML.
///
/// Never fails: fetch or read errors log a warning and yield an empty list.
pub async fn scan_for_emails(client: &reqwest::Client, url: &str) -> Vec<String> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url, error = %e, "website fetch failed");
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        warn!(url, status = %response.status(), "website returned non-success status");
        return Vec::new();
    }

    match response.text().await {
        Ok(html) => extract_emails(&html),
        Err(e) => {
            warn!(url, error = %e, "website body read failed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_and_orders_emails() {
        let html = r#"<p>Contact: info@acme-dental.com or <a href="mailto:office@acme-dental.com">here</a>.
                      Also info@acme-dental.com again.</p>"#;
        let emails = extract_emails(html);
        assert_eq!(emails, vec!["info@acme-dental.com", "office@acme-dental.com"]);
    }

    #[test]
    fn drops_asset_and_artifact_tokens() {
        let html = r#"
            <img src="logo@2x.png">
            <img src="hero-v2@3x-640x480.png.webp">
            <script>import "lodash@4.17.21"; report("abc@o123456@sentry.example")</script>
            <script src="https://browser.sentry-cdn.com/x.js" data-dsn="key@sentry.io"></script>
            <p>real@business.com</p>
        "#;
        let emails = extract_emails(html);
        assert_eq!(emails, vec!["real@business.com"]);
    }

    #[test]
    fn empty_html_yields_empty_list() {
        assert!(extract_emails("").is_empty());
        assert!(extract_emails("<html><body>no addresses</body></html>").is_empty());
    }

    #[tokio::test]
    async fn scan_contains_fetch_failures() {
        let client = reqwest::Client::new();
        // Nothing listens here; the scan must swallow the connect error.
        let emails = scan_for_emails(&client, "http://127.0.0.1:1/none").await;
        assert!(emails.is_empty());
    }

    #[tokio::test]
    async fn scan_reads_mocked_site() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>hello@dentist.example</body></html>"),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let emails = scan_for_emails(&client, &server.uri()).await;
        assert_eq!(emails, vec!["hello@dentist.example"]);
    }
}
