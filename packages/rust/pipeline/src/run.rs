//! End-to-end `search` flow: expand → scrape → aggregate → render → export.
//!
//! All clients are constructed by the caller and injected here; the pipeline
//! owns no process-wide state. Per-sink export failures are contained and
//! reported in the outcome so one sink's rejection never affects the other.

use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use leadscout_export::{DocumentSink, SpreadsheetClient, export_to_spreadsheet, render_csv};
use leadscout_llm::{ChatClient, expand_queries, parse_review_filter};
use leadscout_shared::{LeadScoutError, RawRecord, Result, ResultSet, SourceTag};
use leadscout_sources::{MapsClient, ReviewSiteClient};

use crate::aggregate::aggregate;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The injected client handles the pipeline drives. `None` for an optional
/// export surface disables that surface.
pub struct SearchClients<'a> {
    pub chat: &'a ChatClient,
    pub maps: &'a MapsClient,
    pub reviews: &'a ReviewSiteClient,
    pub spreadsheet: Option<&'a SpreadsheetClient>,
    pub sink: Option<&'a dyn DocumentSink>,
}

/// Configuration for one `search` run.
#[derive(Debug, Clone)]
pub struct LeadSearchConfig {
    /// The user's free-text business query.
    pub query: String,
    /// How many search queries to expand the user text into.
    pub query_count: usize,
    /// Export destinations.
    pub export: ExportTargets,
}

/// Where the rendered outputs go.
#[derive(Debug, Clone)]
pub struct ExportTargets {
    /// Filename the tabular payload is delivered under.
    pub csv_filename: String,
    /// Collaborator granted writer access on the exported spreadsheet.
    pub collaborator_email: Option<String>,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one `search` run.
#[derive(Debug)]
pub enum LeadSearchOutcome {
    /// No adapter produced any record. A distinct response, not an error;
    /// nothing was exported.
    NoResults { elapsed: Duration },
    /// At least one record was found and the exports were attempted.
    Found(SearchReport),
}

/// Detail for a non-empty run.
#[derive(Debug)]
pub struct SearchReport {
    pub results: ResultSet,
    /// The rendered 8-column quoted CSV.
    pub csv: String,
    pub maps_count: usize,
    pub review_count: usize,
    /// Id of the created spreadsheet, when that export succeeded.
    pub spreadsheet_id: Option<String>,
    /// Contained per-sink failures; empty when every export succeeded.
    pub export_errors: Vec<LeadScoutError>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status to the front-end.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each expanded query is searched.
    fn query_searched(&self, query: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &LeadSearchOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn query_searched(&self, _query: &str, _current: usize, _total: usize) {}
    fn done(&self, _outcome: &LeadSearchOutcome) {}
}

// ---------------------------------------------------------------------------
// The pipeline
// ---------------------------------------------------------------------------

/// Run the full `search` flow.
///
/// 1. Expand the user text into concrete search queries
/// 2. Search the maps source once per expanded query
/// 3. Search the review-site source once for the original text
/// 4. Aggregate into one ordered result set (maps records first)
/// 5. Render the CSV and drive the configured export sinks
///
/// An empty result set short-circuits to [`LeadSearchOutcome::NoResults`]
/// before any export. Source failures are contained inside the adapters;
/// only the outcome reports what the exports did.
#[instrument(skip_all, fields(query = %config.query))]
pub async fn run_lead_search(
    clients: &SearchClients<'_>,
    config: &LeadSearchConfig,
    progress: &dyn ProgressReporter,
) -> Result<LeadSearchOutcome> {
    let start = Instant::now();

    progress.phase("Expanding query");
    let queries = expand_queries(clients.chat, &config.query, config.query_count).await;
    let live: Vec<&str> = queries
        .iter()
        .map(String::as_str)
        .filter(|q| !q.is_empty())
        .collect();

    progress.phase("Searching listings");
    let mut maps_records: Vec<RawRecord> = Vec::new();
    let total = live.len();
    for (i, query) in live.iter().enumerate() {
        progress.query_searched(query, i + 1, total);
        maps_records.extend(clients.maps.search(query).await);
    }

    progress.phase("Searching review directory");
    let review_records = match parse_review_filter(clients.chat, &config.query).await {
        Ok(filter) => clients.reviews.search(&filter).await,
        Err(e) => {
            // Without a filter the review source is unreachable; the maps
            // results stand alone.
            warn!(error = %e, "review filter extraction failed, skipping review source");
            Vec::new()
        }
    };

    let results = aggregate(vec![
        (SourceTag::Maps, maps_records),
        (SourceTag::ReviewSite, review_records),
    ]);

    if results.is_empty() {
        info!("no records from any source");
        let outcome = LeadSearchOutcome::NoResults {
            elapsed: start.elapsed(),
        };
        progress.done(&outcome);
        return Ok(outcome);
    }

    progress.phase("Rendering table");
    let csv = render_csv(&results);

    let mut export_errors = Vec::new();

    if let Some(sink) = clients.sink {
        progress.phase("Delivering document");
        if let Err(e) = sink
            .deliver(&config.export.csv_filename, csv.clone().into_bytes())
            .await
        {
            error!(error = %e, "document delivery failed");
            export_errors.push(e);
        }
    }

    let mut spreadsheet_id = None;
    if let Some(sheet) = clients.spreadsheet {
        progress.phase("Writing spreadsheet");
        match export_to_spreadsheet(sheet, &results, config.export.collaborator_email.as_deref())
            .await
        {
            Ok(id) => spreadsheet_id = Some(id),
            Err(e) => {
                error!(error = %e, "spreadsheet export failed");
                export_errors.push(e);
            }
        }
    }

    let report = SearchReport {
        maps_count: results.count_for(SourceTag::Maps),
        review_count: results.count_for(SourceTag::ReviewSite),
        results,
        csv,
        spreadsheet_id,
        export_errors,
        elapsed: start.elapsed(),
    };

    info!(
        maps = report.maps_count,
        review = report.review_count,
        export_errors = report.export_errors.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "lead search complete"
    );

    let outcome = LeadSearchOutcome::Found(report);
    progress.done(&outcome);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use leadscout_shared::{MapsConfig, ReviewsConfig, SpreadsheetConfig};

    /// Sink that records deliveries for assertions.
    #[derive(Default)]
    struct RecordingSink {
        deliveries: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait::async_trait]
    impl DocumentSink for RecordingSink {
        async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> Result<()> {
            self.deliveries
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes));
            Ok(())
        }
    }

    /// Sink that rejects every delivery.
    struct FailingSink;

    #[async_trait::async_trait]
    impl DocumentSink for FailingSink {
        async fn deliver(&self, _filename: &str, _bytes: Vec<u8>) -> Result<()> {
            Err(LeadScoutError::sink("document", "HTTP 403"))
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        })
    }

    /// Mount both chat behaviors: expansion answers with one query, filter
    /// extraction answers with a dentist category.
    async fn mount_chat(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("1. \"dentists in Austin TX\"")),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Query:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"category": "dentist", "country": "US"}"#,
            )))
            .mount(server)
            .await;
    }

    /// Mount a maps source with one place whose website yields one email.
    async fn mount_maps(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "results": [{"place_id": "p1"}],
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/details/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "OK",
                "result": {
                    "name": "Austin Dental",
                    "website": format!("{}/site", server.uri()),
                    "formatted_address": "123 Main St, Austin, TX",
                }
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/site"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("mail front@austindental.example"),
            )
            .mount(server)
            .await;
    }

    /// Mount a review directory with one dentist company at 20 reviews.
    async fn mount_reviews(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a href="/categories/dentist">Dentist</a>"#,
            ))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories/dentist"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a name="business-unit-card" href="/review/acme.example">
                    <p class="typography_heading-xs__x">Acme Dental</p>
                </a>"#,
            ))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories/dentist"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/review/acme.example"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<p data-rating-typography="true">4.6</p>
                <a href="mailto:care@acme.example">Email</a>
                <span class="styles_text__x">20 total reviews</span>"#,
            ))
            .mount(server)
            .await;
    }

    fn maps_client(server: &MockServer) -> MapsClient {
        MapsClient::new(
            &MapsConfig {
                api_key_env: "unused".into(),
                base_url: server.uri(),
                page_delay_ms: 0,
            },
            "key",
        )
        .unwrap()
    }

    fn reviews_client(server: &MockServer) -> ReviewSiteClient {
        ReviewSiteClient::new(&ReviewsConfig {
            base_url: server.uri(),
            min_delay_ms: 0,
            max_delay_ms: 0,
        })
        .unwrap()
    }

    fn search_config() -> LeadSearchConfig {
        LeadSearchConfig {
            query: "dentists in Austin".into(),
            query_count: 2,
            export: ExportTargets {
                csv_filename: "companies_results.csv".into(),
                collaborator_email: None,
            },
        }
    }

    #[tokio::test]
    async fn full_flow_orders_sources_and_delivers_csv() {
        let server = MockServer::start().await;
        mount_chat(&server).await;
        mount_maps(&server).await;
        mount_reviews(&server).await;

        let chat = ChatClient::new(server.uri(), "k", "m").unwrap();
        let maps = maps_client(&server);
        let reviews = reviews_client(&server);
        let sink = RecordingSink::default();

        let outcome = run_lead_search(
            &SearchClients {
                chat: &chat,
                maps: &maps,
                reviews: &reviews,
                spreadsheet: None,
                sink: Some(&sink),
            },
            &search_config(),
            &SilentProgress,
        )
        .await
        .unwrap();

        let LeadSearchOutcome::Found(report) = outcome else {
            panic!("expected records");
        };
        assert_eq!(report.maps_count, 1);
        assert_eq!(report.review_count, 1);
        assert!(report.export_errors.is_empty());

        // Maps records precede review records.
        let tags: Vec<SourceTag> = report.results.iter().map(|e| e.tag).collect();
        assert_eq!(tags, vec![SourceTag::Maps, SourceTag::ReviewSite]);

        let deliveries = sink.deliveries.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "companies_results.csv");
        assert_eq!(deliveries[0].1, report.csv.as_bytes());
        assert!(report.csv.contains("Austin Dental"));
        assert!(report.csv.contains("Acme Dental"));
    }

    #[tokio::test]
    async fn empty_sources_short_circuit_before_export() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("1. dentists")))
            .mount(&server)
            .await;
        // Filter extraction returns no category, so the review source is skipped.
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Query:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/textsearch/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "ZERO_RESULTS", "results": []})),
            )
            .mount(&server)
            .await;

        let chat = ChatClient::new(server.uri(), "k", "m").unwrap();
        let maps = maps_client(&server);
        let reviews = reviews_client(&server);
        let sink = RecordingSink::default();

        let outcome = run_lead_search(
            &SearchClients {
                chat: &chat,
                maps: &maps,
                reviews: &reviews,
                spreadsheet: None,
                sink: Some(&sink),
            },
            &search_config(),
            &SilentProgress,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, LeadSearchOutcome::NoResults { .. }));
        assert!(sink.deliveries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sink_failure_does_not_affect_spreadsheet_export() {
        let server = MockServer::start().await;
        mount_chat(&server).await;
        mount_maps(&server).await;
        mount_reviews(&server).await;

        Mock::given(method("POST"))
            .and(path("/spreadsheets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"spreadsheetId": "sheet-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets/sheet-1:batchUpdate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(wiremock::matchers::path_regex(
                r"^/spreadsheets/sheet-1/values/.*",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"updatedCells": 12})),
            )
            .mount(&server)
            .await;

        let chat = ChatClient::new(server.uri(), "k", "m").unwrap();
        let maps = maps_client(&server);
        let reviews = reviews_client(&server);
        let sheet = SpreadsheetClient::new(
            &SpreadsheetConfig {
                token_env: "unused".into(),
                sheets_base_url: server.uri(),
                drive_base_url: server.uri(),
                collaborator_email: None,
            },
            "token",
        )
        .unwrap();

        let outcome = run_lead_search(
            &SearchClients {
                chat: &chat,
                maps: &maps,
                reviews: &reviews,
                spreadsheet: Some(&sheet),
                sink: Some(&FailingSink),
            },
            &search_config(),
            &SilentProgress,
        )
        .await
        .unwrap();

        let LeadSearchOutcome::Found(report) = outcome else {
            panic!("expected records");
        };
        assert_eq!(report.spreadsheet_id.as_deref(), Some("sheet-1"));
        assert_eq!(report.export_errors.len(), 1);
        assert!(report.export_errors[0].to_string().contains("document"));
    }
}
