use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{info, warn};

use crate::models::Document;

pub const DEFAULT_API_URL: &str = "https://ismp.crpt.ru/api/v3/lk/documents/create";
const SIGNATURE_HEADER: &str = "Signature";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document rejected with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: u16,
    pub body: String,
}

/// Posts signed documents to the creation endpoint. Knows nothing about
/// rate limits; callers gate it.
#[derive(Clone)]
pub struct DocumentClient {
    http: reqwest::Client,
    url: String,
}

impl DocumentClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn create_document(
        &self,
        document: &Document,
        signature: &str,
    ) -> Result<SubmissionReceipt, SubmitError> {
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .json(document)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                "Document {} rejected with status {}",
                document.display_id(),
                status.as_u16()
            );
            return Err(SubmitError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!("Document {} accepted ({})", document.display_id(), status.as_u16());
        Ok(SubmissionReceipt {
            status: status.as_u16(),
            body,
        })
    }
}
