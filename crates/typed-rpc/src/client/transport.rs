//! Wire transports for the batching client.

use crate::batch::{BatchRequest, BatchResponse};
use crate::contract::RouterContract;
use crate::dispatch::Dispatcher;
use crate::{RpcError, RpcResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// Sends one wire request and returns its envelopes.
///
/// An `Err` means the round trip as a whole failed; the client then rejects
/// every call of the batch with `TransportError`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send a batch.
    async fn send(&self, batch: BatchRequest) -> RpcResult<BatchResponse>;
}

// =============================================================================
// HTTP
// =============================================================================

/// `POST {base_url}/rpc` over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport for a server at `base_url` (e.g. `http://127.0.0.1:8080`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Transport reusing an existing `reqwest` client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Fetch the server's contract from `GET {base_url}/rpc/contract`.
    pub async fn contract(&self) -> RpcResult<RouterContract> {
        let url = format!("{}/rpc/contract", self.base_url);
        let response = self.client.get(&url).send().await.map_err(request_failed)?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| {
            RpcError::transport("Malformed contract response").with_cause(e.to_string())
        })
    }
}

fn request_failed(error: reqwest::Error) -> RpcError {
    debug!(error = %error, "HTTP request failed");
    RpcError::transport("HTTP request failed").with_cause(error.to_string())
}

async fn check_status(response: reqwest::Response) -> RpcResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // Request-level failures carry an RpcError body; surface its message.
    let message = match response.json::<RpcError>().await {
        Ok(error) => format!("Server rejected the request with {}: {}", status, error.message),
        Err(_) => format!("Server rejected the request with {}", status),
    };
    debug!(status = %status, "Non-success HTTP status");
    Err(RpcError::transport(message).with_details(serde_json::json!({ "status": status.as_u16() })))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: BatchRequest) -> RpcResult<BatchResponse> {
        let url = format!("{}/rpc", self.base_url);
        trace!(url = %url, calls = batch.len(), "Posting batch");

        let response = self
            .client
            .post(&url)
            .json(&batch)
            .send()
            .await
            .map_err(request_failed)?;
        let response = check_status(response).await?;

        response.json::<BatchResponse>().await.map_err(|e| {
            debug!(error = %e, "Undecodable batch response");
            RpcError::transport("Malformed batch response").with_cause(e.to_string())
        })
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Runs batches on a dispatcher in the same process.
pub struct LocalTransport<Ctx: Send + Sync + 'static> {
    dispatcher: Arc<Dispatcher<Ctx>>,
}

impl<Ctx: Send + Sync + 'static> LocalTransport<Ctx> {
    /// Transport over `dispatcher`.
    pub fn new(dispatcher: Arc<Dispatcher<Ctx>>) -> Self {
        Self { dispatcher }
    }
}

impl<Ctx: Send + Sync + 'static> Clone for LocalTransport<Ctx> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

#[async_trait]
impl<Ctx: Send + Sync + 'static> Transport for LocalTransport<Ctx> {
    async fn send(&self, batch: BatchRequest) -> RpcResult<BatchResponse> {
        self.dispatcher.dispatch(batch).await
    }
}
