//! Query expansion and structured-filter extraction.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, info, warn};

use leadscout_shared::{LeadScoutError, Result, ReviewFilter};

use crate::client::ChatClient;

const EXPAND_SYSTEM: &str =
    "Generate diverse search queries for local business information based on the user's input. \
     Return one query per line, nothing else.";

const FILTER_SYSTEM: &str =
    "You are a helpful assistant that extracts category, country, city, rating, min reviews and \
     max reviews from a query string. If a city is provided, determine the country that city \
     belongs to and return the country's abbreviation (ISO 3166-1 alpha-2 code). Return the \
     output as a JSON object with keys: 'category', 'country', 'city', 'rating', 'min_reviews' \
     and 'max_reviews'.";

/// Leading list numbering like `1. "dentists near me"`.
fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\d+\.\s*"?"#).unwrap())
}

// ---------------------------------------------------------------------------
// Query expansion
// ---------------------------------------------------------------------------

/// Expand a free-text user query into `count` concrete search queries.
///
/// Never fails: a short or failed model response is padded with empty
/// strings up to `count`, and callers skip the empties.
pub async fn expand_queries(client: &ChatClient, user_text: &str, count: usize) -> Vec<String> {
    let user = format!("Generate {count} queries for: {user_text}");

    let mut queries = match client.chat(EXPAND_SYSTEM, &user, Some(150)).await {
        Ok(text) => text
            .lines()
            .map(clean_query)
            .filter(|q| !q.is_empty())
            .collect::<Vec<_>>(),
        Err(e) => {
            error!(error = %e, "query expansion failed");
            Vec::new()
        }
    };

    if queries.len() < count {
        queries.resize(count, String::new());
    }

    info!(?queries, "expanded search queries");
    queries
}

/// Strip list numbering and surrounding quotes from one expanded query line.
fn clean_query(line: &str) -> String {
    let stripped = numbering_re().replace(line.trim(), "");
    stripped.trim().trim_matches('"').trim().to_string()
}

// ---------------------------------------------------------------------------
// Review-filter extraction
// ---------------------------------------------------------------------------

/// Extract a structured review-site filter from the user's free text.
///
/// The model answers in JSON, sometimes wrapped in a markdown code fence;
/// both forms are accepted. Numeric fields tolerate string or number
/// encodings.
pub async fn parse_review_filter(client: &ChatClient, user_text: &str) -> Result<ReviewFilter> {
    let response = client
        .chat(FILTER_SYSTEM, &format!("Query: {user_text}"), None)
        .await?;

    let cleaned = strip_code_fences(&response);
    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| LeadScoutError::parse(format!("filter extraction returned non-JSON: {e}")))?;

    let category = match value.get("category").and_then(|v| v.as_str()) {
        Some(c) if !c.trim().is_empty() => c.trim().to_string(),
        _ => {
            return Err(LeadScoutError::parse(
                "filter extraction returned no category",
            ));
        }
    };

    let filter = ReviewFilter {
        category,
        country: string_field(&value, "country"),
        city: string_field(&value, "city"),
        rating: numeric_field(&value, "rating").map(|n| n.min(5) as u8),
        min_reviews: numeric_field(&value, "min_reviews"),
        max_reviews: numeric_field(&value, "max_reviews"),
    };

    info!(?filter, "extracted review-site filter");
    Ok(filter)
}

/// Remove a surrounding ```json / ``` fence if present.
fn strip_code_fences(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(String::from)
}

fn numeric_field(value: &serde_json::Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => {
            let parsed = s.trim().parse::<u64>().ok();
            if parsed.is_none() && !s.trim().is_empty() {
                warn!(key, raw = %s, "ignoring non-numeric filter field");
            }
            parsed
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        })
    }

    async fn client_for(server: &MockServer) -> ChatClient {
        ChatClient::new(server.uri(), "k", "m").unwrap()
    }

    #[test]
    fn clean_query_strips_numbering_and_quotes() {
        assert_eq!(clean_query(r#"1. "dentists in Austin""#), "dentists in Austin");
        assert_eq!(clean_query("2. plumbers near me"), "plumbers near me");
        assert_eq!(clean_query("  roofers  "), "roofers");
    }

    #[test]
    fn strip_code_fences_handles_all_forms() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn expansion_pads_short_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("1. \"dentists in Austin TX\"")),
            )
            .mount(&server)
            .await;

        let queries = expand_queries(&client_for(&server).await, "dentists", 3).await;
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0], "dentists in Austin TX");
        assert_eq!(queries[1], "");
        assert_eq!(queries[2], "");
    }

    #[tokio::test]
    async fn expansion_survives_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let queries = expand_queries(&client_for(&server).await, "dentists", 2).await;
        assert_eq!(queries, vec![String::new(), String::new()]);
    }

    #[tokio::test]
    async fn filter_parses_fenced_json() {
        let server = MockServer::start().await;
        let json = r#"```json
{"category": "dentist", "country": "US", "city": "Austin", "rating": 4, "min_reviews": 10, "max_reviews": "50"}
```"#;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json)))
            .mount(&server)
            .await;

        let filter = parse_review_filter(&client_for(&server).await, "dentists in Austin")
            .await
            .unwrap();
        assert_eq!(filter.category, "dentist");
        assert_eq!(filter.country.as_deref(), Some("US"));
        assert_eq!(filter.rating, Some(4));
        assert_eq!(filter.min_reviews, Some(10));
        assert_eq!(filter.max_reviews, Some(50));
    }

    #[tokio::test]
    async fn filter_requires_category() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body(r#"{"country": "US"}"#)),
            )
            .mount(&server)
            .await;

        let err = parse_review_filter(&client_for(&server).await, "anything")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("category"));
    }
}
