//! HTTP adapter
//!
//! ```text
//! POST /rpc               JSON array of calls  -> JSON array of envelopes
//! GET  /rpc/contract      router contract
//! GET  /rpc/{path}?input= one query            -> one envelope
//! ```
//!
//! Request-level failures use an HTTP status and an `RpcError` body:
//! a body that is not a JSON array is 400, an oversized batch is 413.
//! A malformed element of the array gets its own `BadRequest` envelope.
//! Everything else, including every per-call failure, is 200 with envelopes.

use crate::batch::Call;
use crate::dispatch::Dispatcher;
use crate::logging::{log_server_listening, log_server_shutdown};
use crate::RpcError;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::debug;

/// Build the RPC routes for a dispatcher.
///
/// Merge the result into a larger application or pass it to [`serve`].
pub fn rpc_routes<Ctx: Send + Sync + 'static>(dispatcher: Arc<Dispatcher<Ctx>>) -> Router {
    let body_limit = dispatcher.config().max_body_size;
    Router::new()
        .route("/rpc", post(post_batch::<Ctx>))
        .route("/rpc/contract", get(get_contract::<Ctx>))
        .route("/rpc/{path}", get(get_query::<Ctx>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(dispatcher)
}

/// Serve `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests finish before the future returns.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    log_server_listening(&addr.to_string());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            log_server_shutdown();
        })
        .await
}

/// Request-level failure.
struct ErrorResponse(RpcError);

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0.sanitize())).into_response()
    }
}

async fn post_batch<Ctx: Send + Sync + 'static>(
    State(dispatcher): State<Arc<Dispatcher<Ctx>>>,
    body: Bytes,
) -> Response {
    let raw: Vec<Value> = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, body_len = body.len(), "Rejecting malformed batch body");
            return ErrorResponse(RpcError::bad_request(format!(
                "Malformed request body: {}",
                e
            )))
            .into_response();
        }
    };

    match dispatcher.dispatch_values(raw).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => ErrorResponse(error).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct QueryParams {
    input: Option<String>,
}

async fn get_query<Ctx: Send + Sync + 'static>(
    State(dispatcher): State<Arc<Dispatcher<Ctx>>>,
    Path(path): Path<String>,
    Query(params): Query<QueryParams>,
) -> Response {
    let input = match params.input.as_deref() {
        None | Some("") => Value::Null,
        Some(raw) => match serde_json::from_str(raw) {
            Ok(input) => input,
            Err(e) => {
                return ErrorResponse(RpcError::bad_request(format!(
                    "Malformed input parameter: {}",
                    e
                )))
                .into_response();
            }
        },
    };

    Json(dispatcher.dispatch_one(Call::query(path, input)).await).into_response()
}

async fn get_contract<Ctx: Send + Sync + 'static>(
    State(dispatcher): State<Arc<Dispatcher<Ctx>>>,
) -> Response {
    Json(dispatcher.contract().clone()).into_response()
}
