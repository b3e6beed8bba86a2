//! Batching client
//!
//! Every call made through an [`RpcClient`] is queued onto one collector
//! task. The collector takes the first queued call, yields so calls issued
//! in the same scheduling tick can join, waits for the configured window,
//! then keeps draining the queue until it stays empty across a yield. The
//! batch goes out as one wire request (split at `max_batch_size`). Each
//! caller gets the envelope at its own position.
//!
//! On a multi-thread runtime the caller and the collector run on different
//! workers, so with no window configured the collector still settles for
//! [`MULTI_THREAD_SETTLE`] before its first drain.
//!
//! ```rust,ignore
//! let client = RpcClient::new(HttpTransport::new("http://127.0.0.1:8080"), ClientConfig::default())?;
//!
//! // One round trip
//! let (user, profile) = tokio::join!(
//!     client.call(&api::USER_GET_BY_ID, &UserIdInput { id: 1 }),
//!     client.call(&api::HEALTH_PROFILE_GET, &UserIdInput { id: 1 }),
//! );
//! ```
//!
//! A failed round trip (network, non-2xx status, undecodable body, wrong
//! envelope count, timeout) rejects every call of that batch with
//! `TransportError`.

mod transport;

pub use transport::{HttpTransport, LocalTransport, Transport};

use crate::batch::{BatchRequest, Call};
use crate::config::{ClientConfig, ConfigValidationError};
use crate::contract::{ProcedureRef, RouterContract};
use crate::procedure::ProcedureKind;
use crate::{RpcError, RpcErrorCode, RpcResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// Settle time used on a multi-thread runtime when no window is configured.
pub const MULTI_THREAD_SETTLE: Duration = Duration::from_millis(1);

struct PendingCall {
    call: Call,
    reply: oneshot::Sender<RpcResult<Value>>,
}

/// Typed client over any [`Transport`].
///
/// Cloning is cheap; clones share the collector. The collector stops once
/// every clone is dropped.
#[derive(Clone)]
pub struct RpcClient {
    sender: mpsc::UnboundedSender<PendingCall>,
    contract: Option<Arc<RouterContract>>,
}

impl RpcClient {
    /// Start a client. Must be called inside a tokio runtime.
    pub fn new(
        transport: impl Transport,
        config: ClientConfig,
    ) -> Result<Self, ConfigValidationError> {
        config.validate()?;

        let settle = config.batch_window().or_else(|| {
            let multi_thread = Handle::try_current()
                .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
            multi_thread.then_some(MULTI_THREAD_SETTLE)
        });

        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(collect(receiver, Arc::new(transport), config, settle));

        Ok(Self {
            sender,
            contract: None,
        })
    }

    /// Reject calls the contract does not serve before they are queued.
    #[must_use = "This method returns a new RpcClient and does not modify self"]
    pub fn with_contract(mut self, contract: RouterContract) -> Self {
        self.contract = Some(Arc::new(contract));
        self
    }

    /// The contract used for local checks, if any.
    pub fn contract(&self) -> Option<&RouterContract> {
        self.contract.as_deref()
    }

    /// Call a shared procedure reference.
    pub async fn call<I, O>(&self, procedure: &ProcedureRef<I, O>, input: &I) -> RpcResult<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        self.typed(procedure.path(), procedure.kind(), input).await
    }

    /// Call a query by path.
    pub async fn query<I, O>(&self, path: &str, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.typed(path, ProcedureKind::Query, input).await
    }

    /// Call a mutation by path.
    pub async fn mutation<I, O>(&self, path: &str, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.typed(path, ProcedureKind::Mutation, input).await
    }

    async fn typed<I, O>(&self, path: &str, kind: ProcedureKind, input: &I) -> RpcResult<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input).map_err(|e| {
            RpcError::bad_request("Input could not be serialized").with_cause(e.to_string())
        })?;
        let call = Call {
            path: path.to_string(),
            kind,
            input,
        };

        let data = self.send(call).await?;
        serde_json::from_value(data).map_err(|e| {
            RpcError::transport("Response data did not match the expected type")
                .with_cause(e.to_string())
        })
    }

    /// Queue one untyped call and wait for its envelope.
    pub async fn send(&self, call: Call) -> RpcResult<Value> {
        if let Some(contract) = &self.contract {
            contract.check(&call.path, call.kind)?;
        }

        let (reply, response) = oneshot::channel();
        self.sender
            .send(PendingCall { call, reply })
            .map_err(|_| RpcError::transport("Client is closed"))?;

        response
            .await
            .unwrap_or_else(|_| Err(RpcError::transport("Client is closed")))
    }
}

// =============================================================================
// Collector
// =============================================================================

async fn collect(
    mut receiver: mpsc::UnboundedReceiver<PendingCall>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    settle: Option<Duration>,
) {
    while let Some(first) = receiver.recv().await {
        let mut pending = vec![first];

        tokio::task::yield_now().await;
        if let Some(window) = settle {
            tokio::time::sleep(window).await;
        }
        while drain(&mut receiver, &mut pending) > 0 && pending.len() < config.max_batch_size {
            tokio::task::yield_now().await;
        }

        trace!(calls = pending.len(), "Batch window closed");
        while !pending.is_empty() {
            let rest = pending.split_off(pending.len().min(config.max_batch_size));
            let chunk = std::mem::replace(&mut pending, rest);
            tokio::spawn(flush(transport.clone(), chunk, config.request_timeout()));
        }
    }
    debug!("RPC client collector stopped");
}

fn drain(
    receiver: &mut mpsc::UnboundedReceiver<PendingCall>,
    pending: &mut Vec<PendingCall>,
) -> usize {
    let before = pending.len();
    while let Ok(next) = receiver.try_recv() {
        pending.push(next);
    }
    pending.len() - before
}

async fn flush(transport: Arc<dyn Transport>, pending: Vec<PendingCall>, timeout: Duration) {
    let (calls, replies): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .map(|pending| (pending.call, pending.reply))
        .unzip();
    let expected = calls.len();

    let outcome = match tokio::time::timeout(timeout, transport.send(BatchRequest::from(calls))).await
    {
        Ok(Ok(response)) if response.len() == expected => Ok(response),
        Ok(Ok(response)) => Err(RpcError::transport("Response envelope count mismatch")
            .with_details(json!({ "expected": expected, "received": response.len() }))),
        Ok(Err(error)) if error.code == RpcErrorCode::TransportError => Err(error),
        Ok(Err(error)) => Err(RpcError::transport(format!(
            "Batch request failed: {}",
            error.message
        ))
        .with_details(json!({ "code": error.code }))),
        Err(_) => Err(RpcError::transport("Request timed out")
            .with_details(json!({ "reason": "timeout", "timeoutMs": timeout.as_millis() as u64 }))),
    };

    match outcome {
        Ok(response) => {
            for (reply, envelope) in replies.into_iter().zip(response) {
                // The caller may have stopped waiting.
                let _ = reply.send(envelope.into_result());
            }
        }
        Err(error) => {
            warn!(
                calls = expected,
                error_message = %error.message,
                cause = ?error.cause,
                "Batch round trip failed"
            );
            let error = RpcError { cause: None, ..error };
            for reply in replies {
                let _ = reply.send(Err(error.clone()));
            }
        }
    }
}
