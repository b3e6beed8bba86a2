//! Server-side dispatch
//!
//! The [`Dispatcher`] owns the router, the context factory and the server
//! configuration. For each wire request it:
//!
//! 1. rejects the whole batch when it is larger than `max_batch_size`,
//!    and answers any element that is not a well-formed call with
//!    `BadRequest` at its own position,
//! 2. creates one context under `context_timeout_ms`,
//! 3. runs every call through size check, resolve, kind check, validate
//!    and execute, concurrently or in order,
//! 4. returns one envelope per call in request order.
//!
//! A context failure fails every call with `InternalError`. A handler error
//! other than `NotFound`, `BadRequest` or `Conflict`, or a handler panic,
//! fails only its own call with a sanitized `InternalError`.

use crate::batch::{BatchMetrics, BatchRequest, BatchResponse, Call, Envelope};
use crate::config::{ConfigValidationError, RpcConfig};
use crate::context::{Context, ContextFactory};
use crate::contract::{ProcedureSignature, RouterContract};
use crate::logging::{
    RedactionEngine, RequestId, log_batch_rejected, log_batch_request, log_call,
    log_call_panicked, log_context_failure, log_malformed_call, log_procedure_registered,
    log_router_built, log_slow_batch,
};
use crate::procedure::kind_mismatch;
use crate::router::{Router, RouterError};
use crate::validation::validate_input_size;
use crate::{RpcError, RpcResult};
use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Runs wire requests against a router.
pub struct Dispatcher<Ctx: Send + Sync + 'static> {
    router: Arc<Router<Ctx>>,
    factory: Arc<dyn ContextFactory<Ctx>>,
    config: RpcConfig,
    redaction: RedactionEngine,
    contract: RouterContract,
}

impl<Ctx: Send + Sync + 'static> Dispatcher<Ctx> {
    /// Create a dispatcher after validating `config`.
    pub fn new(
        router: Router<Ctx>,
        factory: impl ContextFactory<Ctx>,
        config: RpcConfig,
    ) -> Result<Self, ConfigValidationError> {
        config.validate()?;

        let contract = router.contract();
        for (path, procedure) in router.procedures() {
            log_procedure_registered(&path, procedure.kind().as_str());
        }
        log_router_built(router.procedure_count(), &contract.fingerprint);

        Ok(Self {
            router: Arc::new(router),
            factory: Arc::new(factory),
            redaction: RedactionEngine::new(&config.logging),
            config,
            contract,
        })
    }

    /// The router being served.
    pub fn router(&self) -> &Router<Ctx> {
        &self.router
    }

    /// The active configuration.
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Contract of the served router, computed once at construction.
    pub fn contract(&self) -> &RouterContract {
        &self.contract
    }

    /// Check shared procedure references against the served router.
    pub fn verify(&self, signatures: &[ProcedureSignature]) -> Result<(), Vec<RouterError>> {
        self.contract.verify(signatures)
    }

    /// Run one wire request, discarding metrics.
    pub async fn dispatch(&self, batch: BatchRequest) -> RpcResult<BatchResponse> {
        self.dispatch_batch(batch).await.map(|(response, _)| response)
    }

    /// Run a single call, exactly as a one-element batch.
    pub async fn dispatch_one(&self, call: Call) -> Envelope {
        match self.dispatch(BatchRequest::from(vec![call])).await {
            Ok(response) => response
                .into_iter()
                .next()
                .unwrap_or_else(|| Envelope::Failure(RpcError::internal("Empty response").sanitize())),
            Err(error) => Envelope::Failure(error.sanitize()),
        }
    }

    /// Run one wire request.
    ///
    /// Fails as a whole only when the batch exceeds `max_batch_size`; every
    /// other failure is reported inside the envelope of the call it affects.
    pub async fn dispatch_batch(
        &self,
        batch: BatchRequest,
    ) -> RpcResult<(BatchResponse, BatchMetrics)> {
        self.run_entries(batch.calls.into_iter().map(Ok).collect())
            .await
    }

    /// Run a wire request whose elements have not been decoded yet.
    ///
    /// An element that is not a well-formed call gets a `BadRequest`
    /// envelope at its own position; the other calls still run.
    pub async fn dispatch_values(&self, raw: Vec<Value>) -> RpcResult<BatchResponse> {
        self.dispatch_values_batch(raw)
            .await
            .map(|(response, _)| response)
    }

    /// [`Dispatcher::dispatch_values`], keeping the metrics.
    pub async fn dispatch_values_batch(
        &self,
        raw: Vec<Value>,
    ) -> RpcResult<(BatchResponse, BatchMetrics)> {
        self.run_entries(raw.into_iter().map(Call::decode).collect())
            .await
    }

    async fn run_entries(
        &self,
        entries: Vec<RpcResult<Call>>,
    ) -> RpcResult<(BatchResponse, BatchMetrics)> {
        let request_id = RequestId::new();
        let short_id = request_id.short();
        let start = Instant::now();
        let batch_size = entries.len();

        if let Err(error) = self.config.batch_config.check_size(batch_size) {
            log_batch_rejected(&short_id, batch_size, &error);
            return Err(error);
        }

        let mut metrics = BatchMetrics::new(request_id, batch_size);
        if entries.is_empty() {
            trace!(request_id = %short_id, "Empty batch");
            return Ok((BatchResponse::default(), metrics));
        }

        let response = match self.create_context(request_id, batch_size).await {
            Ok(ctx) => self.run_calls(&ctx, &request_id, entries).await,
            Err(_) => {
                let failure = RpcError::internal("Context creation failed").sanitize();
                BatchResponse::new(vec![Envelope::Failure(failure); batch_size])
            }
        };

        metrics.record(&response);
        metrics.duration_ms = start.elapsed().as_millis() as u64;

        log_batch_request(
            &short_id,
            batch_size,
            metrics.success_count,
            metrics.error_count,
            metrics.duration_ms,
        );
        if self.config.logging.is_slow(metrics.duration_ms)
            && let Some(threshold) = self.config.logging.slow_batch_threshold_ms
        {
            log_slow_batch(&short_id, batch_size, metrics.duration_ms, threshold);
        }

        Ok((response, metrics))
    }

    async fn create_context(
        &self,
        request_id: RequestId,
        batch_size: usize,
    ) -> RpcResult<Context<Ctx>> {
        let short_id = request_id.short();
        let timeout = self.config.context_timeout();
        let created = tokio::time::timeout(
            timeout,
            self.factory.create_context_for_request(request_id),
        )
        .await;

        let error = match created {
            Ok(Ok(ctx)) => {
                trace!(request_id = %short_id, "Context created");
                return Ok(Context::new(ctx));
            }
            Ok(Err(error)) => {
                let cause = error.cause.clone().unwrap_or_else(|| error.message.clone());
                RpcError::internal("Context creation failed").with_cause(cause)
            }
            Err(_) => RpcError::internal("Context creation timed out")
                .with_cause(format!("no context after {}ms", timeout.as_millis())),
        };

        log_context_failure(&short_id, batch_size, &error);
        Err(error)
    }

    async fn run_calls(
        &self,
        ctx: &Context<Ctx>,
        request_id: &RequestId,
        entries: Vec<RpcResult<Call>>,
    ) -> BatchResponse {
        let envelopes = if self.config.batch_config.parallel_execution {
            join_all(
                entries
                    .into_iter()
                    .map(|entry| self.run_entry(ctx.clone(), request_id, entry)),
            )
            .await
        } else {
            let mut envelopes = Vec::with_capacity(entries.len());
            for entry in entries {
                envelopes.push(self.run_entry(ctx.clone(), request_id, entry).await);
            }
            envelopes
        };
        BatchResponse::new(envelopes)
    }

    async fn run_entry(
        &self,
        ctx: Context<Ctx>,
        request_id: &RequestId,
        entry: RpcResult<Call>,
    ) -> Envelope {
        match entry {
            Ok(call) => self.run_call(ctx, request_id, call).await,
            Err(error) => {
                log_malformed_call(request_id, &error);
                Envelope::Failure(error.sanitize())
            }
        }
    }

    async fn run_call(&self, ctx: Context<Ctx>, request_id: &RequestId, call: Call) -> Envelope {
        let started = Instant::now();
        let result = self.execute_call(ctx, request_id, &call).await;
        let duration_us = started.elapsed().as_micros() as u64;

        let logging = &self.config.logging;
        if result.is_err() || logging.should_log_path(&call.path) {
            let input = logging
                .log_inputs
                .then(|| self.redaction.redact(&call.input));
            log_call(
                logging.level,
                request_id,
                &call.path,
                duration_us,
                input.as_ref(),
                result.as_ref().map(|_| ()),
            );
        }

        Envelope::from(result.map_err(RpcError::sanitize))
    }

    /// Size check, resolve, kind check, validate, execute.
    async fn execute_call(
        &self,
        ctx: Context<Ctx>,
        request_id: &RequestId,
        call: &Call,
    ) -> RpcResult<Value> {
        validate_input_size(&call.input, &self.config)?;

        let procedure = self.router.resolve(&call.path)?;
        if procedure.kind() != call.kind {
            return Err(kind_mismatch(&call.path, procedure.kind(), call.kind));
        }

        let validated = procedure.validate(&call.input)?;
        trace!(path = %call.path, "Input validated");

        match AssertUnwindSafe(procedure.execute(ctx, validated))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => {
                let detail = error.cause.clone().unwrap_or_else(|| error.message.clone());
                let wire = error.into_wire();
                if wire.is_domain_error() {
                    Err(wire)
                } else {
                    Err(wire.with_cause(detail))
                }
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log_call_panicked(request_id, &call.path, &message);
                Err(RpcError::internal("Handler panicked").with_cause(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
