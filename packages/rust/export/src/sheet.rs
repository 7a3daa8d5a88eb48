//! Spreadsheet projection and the client that persists it.
//!
//! The spreadsheet view is intentionally narrower than the tabular one: six
//! columns, no review count, and for review-site records the second column
//! carries the rating instead of the website. Degraded records are skipped
//! here with a warning — the narrow schema has no best-effort row shape.
//!
//! Persisting is four sequential calls against the spreadsheet service:
//! create the spreadsheet, add a results sheet, write the rows at the `A1`
//! anchor, grant the configured collaborator writer access. Each failure is
//! logged; none is retried.

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use leadscout_shared::{
    LeadScoutError, NormalizedRecord, Provenance, Result, ResultSet, SourceTag, SpreadsheetConfig,
    UNKNOWN,
};

/// The fixed spreadsheet header.
pub const SHEET_HEADER: [&str; 6] = [
    "Company Name",
    "Website/Rating",
    "Emails/Contact Info",
    "Phone",
    "Location",
    "Verification",
];

// ---------------------------------------------------------------------------
// Row projection
// ---------------------------------------------------------------------------

/// Project a result set into 6-column rows, header included as row zero.
pub fn to_sheet_rows(results: &ResultSet) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(results.len() + 1);
    rows.push(SHEET_HEADER.iter().map(|h| h.to_string()).collect());

    for entry in results {
        match &entry.provenance {
            Provenance::Clean => rows.push(project_row(entry.tag, &entry.record)),
            Provenance::Degraded { reason } => {
                warn!(
                    company = %entry.record.company_name,
                    reason,
                    "skipping degraded record in spreadsheet export"
                );
            }
        }
    }

    rows
}

fn project_row(tag: SourceTag, record: &NormalizedRecord) -> Vec<String> {
    match tag {
        // Maps rows only carry identity and contact columns.
        SourceTag::Maps => vec![
            record.company_name.clone(),
            record.website.to_string(),
            record.emails_joined(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
        ],
        // Review rows fold the rating into the second column.
        SourceTag::ReviewSite => vec![
            record.company_name.clone(),
            record.rating.to_string(),
            record.emails_joined(),
            record.phone.to_string(),
            record.location.to_string(),
            record.verified.to_string(),
        ],
    }
}

// ---------------------------------------------------------------------------
// SpreadsheetClient
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "spreadsheetId")]
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "updatedCells", default)]
    updated_cells: u64,
}

/// Handle on the spreadsheet and file-permission services. Constructed once
/// per process and injected into the pipeline entry point.
#[derive(Debug, Clone)]
pub struct SpreadsheetClient {
    http: reqwest::Client,
    sheets_base_url: String,
    drive_base_url: String,
    token: String,
}

impl SpreadsheetClient {
    /// Create a client from the `[spreadsheet]` config section and a
    /// resolved bearer token.
    pub fn new(config: &SpreadsheetConfig, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("LeadScout/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            sheets_base_url: config.sheets_base_url.trim_end_matches('/').to_string(),
            drive_base_url: config.drive_base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadScoutError::sink("spreadsheet", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::sink(
                "spreadsheet",
                format!("{url}: HTTP {status}: {text}"),
            ));
        }
        Ok(response)
    }

    /// Create a new spreadsheet and return its id.
    pub async fn create_spreadsheet(&self, title: &str) -> Result<String> {
        let url = format!("{}/spreadsheets", self.sheets_base_url);
        let response = self
            .post_json(&url, json!({"properties": {"title": title}}))
            .await?;

        let parsed: CreateResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::sink("spreadsheet", format!("create response: {e}")))?;

        info!(spreadsheet_id = %parsed.spreadsheet_id, "spreadsheet created");
        Ok(parsed.spreadsheet_id)
    }

    /// Add a named sheet to an existing spreadsheet.
    pub async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        let url = format!(
            "{}/spreadsheets/{spreadsheet_id}:batchUpdate",
            self.sheets_base_url
        );
        self.post_json(
            &url,
            json!({"requests": [{"addSheet": {"properties": {"title": title}}}]}),
        )
        .await?;

        info!(sheet = title, "sheet added");
        Ok(())
    }

    /// Write rows starting at the fixed `A1` anchor of the named sheet.
    pub async fn write_rows(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
        rows: &[Vec<String>],
    ) -> Result<u64> {
        let range = format!("{sheet_title}!A1");
        let url = format!(
            "{}/spreadsheets/{spreadsheet_id}/values/{range}?valueInputOption=RAW",
            self.sheets_base_url
        );

        let response = self.put_json(&url, json!({"values": rows})).await?;
        let parsed: UpdateResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::sink("spreadsheet", format!("update response: {e}")))?;

        info!(cells = parsed.updated_cells, "rows written");
        Ok(parsed.updated_cells)
    }

    async fn put_json(&self, url: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadScoutError::sink("spreadsheet", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::sink(
                "spreadsheet",
                format!("{url}: HTTP {status}: {text}"),
            ));
        }
        Ok(response)
    }

    /// Grant a collaborator writer access to the spreadsheet file.
    pub async fn grant_writer(&self, spreadsheet_id: &str, email: &str) -> Result<()> {
        let url = format!("{}/files/{spreadsheet_id}/permissions", self.drive_base_url);
        self.post_json(
            &url,
            json!({"type": "user", "role": "writer", "emailAddress": email}),
        )
        .await?;

        info!(email, "writer access granted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Export driver
// ---------------------------------------------------------------------------

/// Persist a result set to a fresh spreadsheet. Returns the spreadsheet id.
///
/// Drives the four service calls in sequence. A missing collaborator simply
/// skips the grant step.
#[instrument(skip_all, fields(records = results.len()))]
pub async fn export_to_spreadsheet(
    client: &SpreadsheetClient,
    results: &ResultSet,
    collaborator: Option<&str>,
) -> Result<String> {
    let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    let spreadsheet_id = client
        .create_spreadsheet(&format!("Search Results {stamp}"))
        .await?;

    let sheet_title = format!("Results {stamp}");
    client.add_sheet(&spreadsheet_id, &sheet_title).await?;

    let rows = to_sheet_rows(results);
    client
        .write_rows(&spreadsheet_id, &sheet_title, &rows)
        .await?;

    if let Some(email) = collaborator {
        client.grant_writer(&spreadsheet_id, email).await?;
    }

    Ok(spreadsheet_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_shared::{Field, Normalized, Verification};
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_set() -> ResultSet {
        let mut set = ResultSet::new();
        set.push(
            SourceTag::Maps,
            Normalized::Clean(NormalizedRecord {
                company_name: "Acme".into(),
                website: Field::Known("https://acme.example".into()),
                contact_emails: vec!["a@acme.example".into()],
                phone: Field::Known("512".into()),
                location: Field::Known("Austin".into()),
                rating: Field::Unknown,
                review_count: Field::Known("42".into()),
                verified: Verification::Unknown,
            }),
        );
        set.push(
            SourceTag::ReviewSite,
            Normalized::Clean(NormalizedRecord {
                company_name: "Lowkey".into(),
                website: Field::Known("https://lowkey.example".into()),
                contact_emails: vec!["hi@lowkey.example".into()],
                phone: Field::Known("151".into()),
                location: Field::Known("Austin, United States".into()),
                rating: Field::Known("4.6".into()),
                review_count: Field::Known("20".into()),
                verified: Verification::Verified,
            }),
        );
        set
    }

    #[test]
    fn rows_project_per_source_pattern() {
        let rows = to_sheet_rows(&sample_set());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], SHEET_HEADER.to_vec());

        // Maps: identity and contact only.
        assert_eq!(
            rows[1],
            vec!["Acme", "https://acme.example", "a@acme.example", "N/A", "N/A", "N/A"]
        );
        // Review: rating folded into the second column, no review count.
        assert_eq!(
            rows[2],
            vec!["Lowkey", "4.6", "hi@lowkey.example", "151", "Austin, United States", "True"]
        );
    }

    #[test]
    fn degraded_records_are_skipped() {
        let mut set = sample_set();
        set.push(
            SourceTag::Maps,
            Normalized::Degraded {
                record: NormalizedRecord::bare("Mystery"),
                reason: "shape mismatch".into(),
            },
        );

        let rows = to_sheet_rows(&set);
        assert_eq!(rows.len(), 3);
        assert!(!rows.iter().any(|r| r[0] == "Mystery"));
    }

    #[tokio::test]
    async fn export_drives_all_four_calls() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/spreadsheets"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"spreadsheetId": "sheet-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/spreadsheets/sheet-1:batchUpdate$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/spreadsheets/sheet-1/values/.*"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"updatedCells": 18})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/files/sheet-1/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let config = SpreadsheetConfig {
            token_env: "unused".into(),
            sheets_base_url: server.uri(),
            drive_base_url: server.uri(),
            collaborator_email: Some("ops@example.com".into()),
        };
        let client = SpreadsheetClient::new(&config, "token").unwrap();

        let id = export_to_spreadsheet(&client, &sample_set(), Some("ops@example.com"))
            .await
            .unwrap();
        assert_eq!(id, "sheet-1");
    }

    #[tokio::test]
    async fn create_failure_surfaces_as_sink_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/spreadsheets"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let config = SpreadsheetConfig {
            token_env: "unused".into(),
            sheets_base_url: server.uri(),
            drive_base_url: server.uri(),
            collaborator_email: None,
        };
        let client = SpreadsheetClient::new(&config, "token").unwrap();

        let err = export_to_spreadsheet(&client, &sample_set(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("spreadsheet"));
        assert!(err.to_string().contains("401"));
    }
}
