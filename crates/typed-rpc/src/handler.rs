//! Handler erasure
//!
//! A handler is any `async fn(Context<Ctx>, Input) -> RpcResult<Output>`.
//! Procedures store it as an [`ErasedHandler`] that takes the validated JSON
//! value and returns the serialized output, so one router can hold
//! handlers of every input and output type.

use crate::{Context, RpcError, RpcResult};
use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{trace, warn};

pub(crate) type ErasedHandler<Ctx> =
    Arc<dyn Fn(Context<Ctx>, Value) -> BoxFuture<'static, RpcResult<Value>> + Send + Sync>;

/// Async function usable as a procedure body.
///
/// Implemented for every `Fn(Context<Ctx>, Input) -> impl Future<Output =
/// RpcResult<Output>>` that is `Clone + Send + Sync`.
pub trait Handler<Ctx, Input, Output>: Clone + Send + Sync + 'static
where
    Ctx: Send + Sync + 'static,
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
{
    /// Future returned by [`Handler::call`]
    type Future: Future<Output = RpcResult<Output>> + Send;

    /// Run the handler.
    fn call(&self, ctx: Context<Ctx>, input: Input) -> Self::Future;
}

impl<Ctx, Input, Output, F, Fut> Handler<Ctx, Input, Output> for F
where
    Ctx: Send + Sync + 'static,
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
    F: Fn(Context<Ctx>, Input) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = RpcResult<Output>> + Send + 'static,
{
    type Future = Fut;

    fn call(&self, ctx: Context<Ctx>, input: Input) -> Self::Future {
        self(ctx, input)
    }
}

/// Erase `handler`'s input and output types.
///
/// The value passed in has already satisfied the procedure's schema. If the
/// schema and `Input` disagree the procedure itself is broken, so the call
/// fails with a sanitized `InternalError`.
pub(crate) fn erase<Ctx, Input, Output, H>(handler: H) -> ErasedHandler<Ctx>
where
    Ctx: Send + Sync + 'static,
    Input: DeserializeOwned + Send + 'static,
    Output: Serialize + Send + 'static,
    H: Handler<Ctx, Input, Output>,
{
    Arc::new(move |ctx, raw| {
        let handler = handler.clone();
        Box::pin(async move {
            let input = decode::<Input>(raw)?;
            let output = handler.call(ctx, input).await.inspect_err(|e| {
                trace!(error_code = %e.code, "Handler returned error");
            })?;
            serde_json::to_value(output).map_err(|e| {
                warn!(error = %e, "Handler output is not serializable");
                RpcError::internal("Output serialization failed").with_cause(e.to_string())
            })
        })
    })
}

fn decode<Input: DeserializeOwned>(raw: Value) -> RpcResult<Input> {
    serde_json::from_value(raw).map_err(|e| {
        warn!(error = %e, "Validated input did not fit handler input type");
        RpcError::internal("Handler input type does not match its schema")
            .with_cause(e.to_string())
    })
}
