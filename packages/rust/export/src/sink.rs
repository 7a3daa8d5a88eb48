//! Document delivery seam for the tabular export.
//!
//! The pipeline hands the sink a filename and the quoted-CSV bytes; where
//! they go (a chat attachment endpoint, an object store, a test buffer) is
//! the sink's business.

use tracing::{info, instrument};

use leadscout_shared::{LeadScoutError, Result};

/// Accepts a byte-encoded tabular payload with a filename.
#[async_trait::async_trait]
pub trait DocumentSink: Send + Sync {
    async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Delivers the payload as a multipart `document` field to an HTTP endpoint.
pub struct HttpDocumentSink {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpDocumentSink {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentSink for HttpDocumentSink {
    #[instrument(skip(self, bytes), fields(filename, size = bytes.len()))]
    async fn deliver(&self, filename: &str, bytes: Vec<u8>) -> Result<()> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/csv")
            .map_err(|e| LeadScoutError::sink("document", e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("document", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LeadScoutError::sink("document", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::sink(
                "document",
                format!("HTTP {status}: {body}"),
            ));
        }

        info!(filename, "document delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn delivers_multipart_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpDocumentSink::new(reqwest::Client::new(), format!("{}/upload", server.uri()));
        sink.deliver("companies_results.csv", b"\"a\",\"b\"\r\n".to_vec())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_a_sink_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let sink = HttpDocumentSink::new(reqwest::Client::new(), format!("{}/upload", server.uri()));
        let err = sink
            .deliver("companies_results.csv", vec![])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("document"));
        assert!(err.to_string().contains("403"));
    }
}
