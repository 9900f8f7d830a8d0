pub mod config;
pub mod error;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::models::Document;
use crate::services::{
    document_client::{DocumentClient, SubmissionReceipt, DEFAULT_API_URL},
    gate::Gate,
    rate_window::TimeUnit,
};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the document creation API that never sends more than the
/// configured number of requests per time unit. Clones share one gate.
#[derive(Clone)]
pub struct CrptApi {
    gate: Arc<Gate>,
    client: DocumentClient,
}

impl CrptApi {
    pub fn new(unit: TimeUnit, limit: i64) -> ApiResult<Self> {
        let gate = Gate::new(unit, limit)?;
        let client = DocumentClient::new(DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT)?;
        Ok(Self::with_parts(gate, client))
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let gate = Gate::new(config.gate.unit, config.gate.limit)?;
        let client = DocumentClient::new(config.api_url.clone(), config.request_timeout())?;
        Ok(Self::with_parts(gate, client))
    }

    pub fn from_env() -> ApiResult<Self> {
        Self::from_config(&ApiConfig::from_env()?)
    }

    pub fn with_parts(gate: Gate, client: DocumentClient) -> Self {
        Self {
            gate: Arc::new(gate),
            client,
        }
    }

    /// Waits for an admission, then submits. The admission is spent whether
    /// or not the submission succeeds.
    pub async fn create_document(
        &self,
        document: &Document,
        signature: &str,
    ) -> ApiResult<SubmissionReceipt> {
        let receipt = self
            .gate
            .run(self.client.create_document(document, signature))
            .await?;
        Ok(receipt)
    }

    pub async fn create_document_cancellable(
        &self,
        document: &Document,
        signature: &str,
        token: &CancellationToken,
    ) -> ApiResult<SubmissionReceipt> {
        let receipt = self
            .gate
            .run_cancellable(token, self.client.create_document(document, signature))
            .await??;
        Ok(receipt)
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn client(&self) -> &DocumentClient {
        &self.client
    }
}
