use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{
    BookId, ErrorBody, IDEMPOTENCY_KEY_HEADER, PlaceReceiptBody, ReceiptId, ReceiptStatus,
    ReceiptView, UserId,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ReceiptClientError, Result};

/// Default request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the ledger lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A receipt returned by [`ReceiptGateway::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedReceipt {
    pub receipt: ReceiptView,
    /// True when the ledger answered an idempotent retry with the receipt it
    /// created earlier (`200`) rather than a new one (`201`).
    pub replayed: bool,
}

/// Receipt operations the placement service needs from the ledger.
#[async_trait]
pub trait ReceiptGateway: Send + Sync {
    /// Asks the ledger to create a receipt for `user_id` on `book_id`.
    async fn place(
        &self,
        user_id: UserId,
        book_id: BookId,
        idempotency_key: Option<&str>,
    ) -> Result<PlacedReceipt>;

    /// Marks an active receipt canceled, releasing its book.
    async fn cancel(&self, receipt_id: ReceiptId) -> Result<()>;

    /// Lists a user's live receipts.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ReceiptView>>;
}

/// [`ReceiptGateway`] over the ledger's HTTP API.
///
/// Each operation is exactly one request. There are no retries; the only
/// deadline is the configured timeout.
#[derive(Debug, Clone)]
pub struct RemoteReceiptClient {
    client: Client,
    base_url: String,
}

impl RemoteReceiptClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ReceiptClientError::Decode(e.to_string()))
    }

    /// Turns a non-success response into an error carrying the ledger's message.
    async fn remote_error(response: Response) -> ReceiptClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);

        if status == StatusCode::CONFLICT {
            ReceiptClientError::Conflict(message)
        } else {
            ReceiptClientError::Remote {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn record(operation: &'static str, started: Instant, result: &Result<impl Sized>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(ReceiptClientError::Conflict(_)) => "conflict",
        Err(ReceiptClientError::Remote { .. }) => "remote_error",
        Err(ReceiptClientError::Transport(_)) => "transport_error",
        Err(ReceiptClientError::Decode(_)) => "decode_error",
    };
    metrics::counter!("ledger_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("ledger_request_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

#[async_trait]
impl ReceiptGateway for RemoteReceiptClient {
    #[tracing::instrument(skip(self))]
    async fn place(
        &self,
        user_id: UserId,
        book_id: BookId,
        idempotency_key: Option<&str>,
    ) -> Result<PlacedReceipt> {
        let started = Instant::now();
        let result: Result<PlacedReceipt> = async {
            let mut request = self
                .client
                .post(self.url("/receipts"))
                .json(&PlaceReceiptBody { user_id, book_id });
            if let Some(key) = idempotency_key {
                request = request.header(IDEMPOTENCY_KEY_HEADER, key);
            }

            let response = request.send().await?;
            if response.status().is_success() {
                let replayed = response.status() == StatusCode::OK;
                let receipt = Self::decode(response).await?;
                Ok(PlacedReceipt { receipt, replayed })
            } else {
                Err(Self::remote_error(response).await)
            }
        }
        .await;

        record("place", started, &result);
        if let Err(e) = &result {
            tracing::info!(error = %e, "placement call failed");
        }
        result
    }

    #[tracing::instrument(skip(self))]
    async fn cancel(&self, receipt_id: ReceiptId) -> Result<()> {
        let started = Instant::now();
        let result: Result<()> = async {
            let response = self
                .client
                .patch(self.url(&format!("/receipts/{receipt_id}/status")))
                .json(&ReceiptStatus::Canceled)
                .send()
                .await?;
            if response.status().is_success() {
                Ok(())
            } else {
                Err(Self::remote_error(response).await)
            }
        }
        .await;

        record("cancel", started, &result);
        result
    }

    #[tracing::instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ReceiptView>> {
        let started = Instant::now();
        let result: Result<Vec<ReceiptView>> = async {
            let response = self
                .client
                .get(self.url(&format!("/receipts/user/{user_id}")))
                .send()
                .await?;
            if response.status().is_success() {
                Self::decode(response).await
            } else {
                Err(Self::remote_error(response).await)
            }
        }
        .await;

        record("list_for_user", started, &result);
        result
    }
}
