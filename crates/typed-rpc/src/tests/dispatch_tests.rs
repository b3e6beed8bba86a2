//! Dispatcher tests
//!
//! Batch shape, per-call isolation, error propagation policy and the
//! context factory contract.

use super::support::{IdInput, TestContext, dispatcher, dispatcher_with, test_router};
use crate::{
    BatchConfig, BatchRequest, Call, CloneContext, Context, ContextFactory, Dispatcher, Envelope,
    INTERNAL_ERROR_MESSAGE, ProcedureKind, RequestId, Router, RpcConfig, RpcError, RpcErrorCode,
    RpcResult, Schema, context_fn, procedure,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn failure(envelope: &Envelope) -> &RpcError {
    envelope.error().expect("expected a failed envelope")
}

#[tokio::test]
async fn test_valid_and_invalid_calls_resolve_independently() {
    let dispatcher = dispatcher(TestContext::default());
    let batch = BatchRequest::new()
        .mutation("account.create", json!({"email": "a@b.com", "name": "Al"}))
        .mutation("account.create", json!({"email": "bad", "name": "B"}));

    let (response, metrics) = dispatcher.dispatch_batch(batch).await.unwrap();

    assert_eq!(response.len(), 2);
    assert_eq!(
        response.envelopes[0],
        Envelope::Success(json!({"id": 1, "email": "a@b.com", "name": "Al"}))
    );
    let error = failure(&response.envelopes[1]);
    assert_eq!(error.code, RpcErrorCode::BadRequest);
    assert_eq!(error.field_issues.len(), 2);
    assert_eq!(metrics.success_count, 1);
    assert_eq!(metrics.error_count, 1);
    assert_eq!(metrics.total_requests, 2);
}

#[tokio::test]
async fn test_domain_errors_pass_through() {
    let dispatcher = dispatcher(TestContext::default());
    let batch = BatchRequest::new()
        .query("account.get", json!({"id": 42}))
        .mutation("account.create", json!({"email": "a@b.com", "name": "Al"}))
        .mutation("account.create", json!({"email": "a@b.com", "name": "Al"}));

    let response = dispatcher.dispatch(batch).await.unwrap();

    let not_found = failure(&response.envelopes[0]);
    assert_eq!(not_found.code, RpcErrorCode::NotFound);
    assert_eq!(not_found.message, "Account 42 not found");
    // Parallel execution means either create may win; exactly one conflicts.
    let conflicts = response.envelopes[1..]
        .iter()
        .filter(|e| e.error().is_some_and(|e| e.code == RpcErrorCode::Conflict))
        .count();
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn test_missing_result_is_null_data() {
    let dispatcher = dispatcher(TestContext::default());
    let envelope = dispatcher
        .dispatch_one(Call::query("account.find", json!({"id": 9})))
        .await;
    assert_eq!(envelope, Envelope::Success(Value::Null));
    assert_eq!(
        serde_json::to_value(&envelope).unwrap(),
        json!({"ok": true, "data": null})
    );
}

#[tokio::test]
async fn test_unknown_path_and_kind_mismatch() {
    let dispatcher = dispatcher(TestContext::default());
    let batch = BatchRequest::new()
        .query("account.remove", json!({"id": 1}))
        .mutation("account.get", json!({"id": 1}))
        .query("account", Value::Null);

    let response = dispatcher.dispatch(batch).await.unwrap();

    assert_eq!(failure(&response.envelopes[0]).code, RpcErrorCode::NotFound);
    let mismatch = failure(&response.envelopes[1]);
    assert_eq!(mismatch.code, RpcErrorCode::BadRequest);
    assert_eq!(
        mismatch.message,
        "Procedure 'account.get' is a query, called as a mutation"
    );
    assert_eq!(failure(&response.envelopes[2]).code, RpcErrorCode::NotFound);
}

#[tokio::test]
async fn test_panicking_handler_is_internal_and_isolated() {
    let dispatcher = dispatcher(TestContext::default());
    let batch = BatchRequest::new()
        .query("explode", Value::Null)
        .query("echo", json!("still here"));

    let response = dispatcher.dispatch(batch).await.unwrap();

    let error = failure(&response.envelopes[0]);
    assert_eq!(error.code, RpcErrorCode::InternalError);
    assert_eq!(error.message, INTERNAL_ERROR_MESSAGE);
    assert!(error.cause.is_none());
    assert_eq!(response.envelopes[1], Envelope::Success(json!("still here")));
}

#[tokio::test]
async fn test_internal_detail_never_serialized() {
    let dispatcher = dispatcher(TestContext::default());
    let response = dispatcher
        .dispatch(BatchRequest::new().mutation("broken", Value::Null))
        .await
        .unwrap();

    let wire = serde_json::to_string(&response).unwrap();
    assert!(!wire.contains("db-primary"));
    assert!(!wire.contains("ECONNREFUSED"));
    assert_eq!(
        failure(&response.envelopes[0]).code,
        RpcErrorCode::InternalError
    );
}

#[tokio::test]
async fn test_context_failure_fails_every_call() {
    let factory = context_fn(|| async {
        Err::<TestContext, _>(RpcError::not_found("store offline").with_cause("disk gone"))
    });
    let dispatcher = Dispatcher::new(test_router(), factory, RpcConfig::default()).unwrap();

    let batch = BatchRequest::new()
        .query("echo", json!(1))
        .mutation("account.create", json!({"email": "a@b.com", "name": "Al"}))
        .query("missing", Value::Null);
    let (response, metrics) = dispatcher.dispatch_batch(batch).await.unwrap();

    assert_eq!(response.len(), 3);
    for envelope in &response.envelopes {
        let error = failure(envelope);
        assert_eq!(error.code, RpcErrorCode::InternalError);
        assert_eq!(error.message, INTERNAL_ERROR_MESSAGE);
    }
    assert_eq!(metrics.error_count, 3);
}

#[tokio::test]
async fn test_context_timeout_fails_every_call() {
    let factory = context_fn(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, RpcError>(TestContext::default())
    });
    let config = RpcConfig::new().with_context_timeout(Duration::from_millis(20));
    let dispatcher = Dispatcher::new(test_router(), factory, config).unwrap();

    let response = dispatcher
        .dispatch(BatchRequest::new().query("echo", json!(1)).query("echo", json!(2)))
        .await
        .unwrap();

    assert!(response.envelopes.iter().all(|e| {
        e.error().is_some_and(|e| e.code == RpcErrorCode::InternalError)
    }));
}

#[tokio::test]
async fn test_context_created_once_per_request() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let factory = context_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, RpcError>(TestContext::default()) }
    });
    let dispatcher = Dispatcher::new(test_router(), factory, RpcConfig::default()).unwrap();

    let batch = BatchRequest::new()
        .query("echo", json!(1))
        .query("echo", json!(2))
        .query("echo", json!(3));
    dispatcher.dispatch(batch.clone()).await.unwrap();
    dispatcher.dispatch(batch).await.unwrap();

    assert_eq!(created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_oversized_batch_rejected_before_any_call() {
    let ctx = TestContext::default();
    let config = RpcConfig::new().with_batch_config(BatchConfig::new().with_max_batch_size(2));
    let dispatcher = dispatcher_with(ctx.clone(), config);

    let batch = BatchRequest::new()
        .query("account.get", json!({"id": 1}))
        .query("account.get", json!({"id": 2}))
        .query("account.get", json!({"id": 3}));
    let error = dispatcher.dispatch(batch).await.unwrap_err();

    assert_eq!(error.code, RpcErrorCode::PayloadTooLarge);
    assert_eq!(ctx.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_input_fails_only_that_call() {
    let config = RpcConfig::new().with_max_input_size(64);
    let dispatcher = dispatcher_with(TestContext::default(), config);

    let batch = BatchRequest::new()
        .query("echo", json!({"blob": "x".repeat(200)}))
        .query("echo", json!({"small": true}));
    let response = dispatcher.dispatch(batch).await.unwrap();

    assert_eq!(
        failure(&response.envelopes[0]).code,
        RpcErrorCode::PayloadTooLarge
    );
    assert!(response.envelopes[1].is_ok());
}

#[tokio::test]
async fn test_empty_batch_yields_empty_response() {
    let dispatcher = dispatcher(TestContext::default());
    let (response, metrics) = dispatcher.dispatch_batch(BatchRequest::new()).await.unwrap();
    assert!(response.is_empty());
    assert_eq!(metrics.total_requests, 0);
}

#[tokio::test]
async fn test_sequential_execution_runs_in_order() {
    let config =
        RpcConfig::new().with_batch_config(BatchConfig::new().with_parallel_execution(false));
    let dispatcher = dispatcher_with(TestContext::default(), config);

    let batch = BatchRequest::new()
        .mutation("account.create", json!({"email": "one@x.com", "name": "One"}))
        .mutation("account.create", json!({"email": "two@x.com", "name": "Two"}))
        .query("account.get", json!({"id": 2}));
    let response = dispatcher.dispatch(batch).await.unwrap();

    assert_eq!(response.envelopes[0].data().unwrap()["id"], 1);
    assert_eq!(response.envelopes[1].data().unwrap()["id"], 2);
    assert_eq!(response.envelopes[2].data().unwrap()["name"], "Two");
}

#[tokio::test]
async fn test_parallel_calls_overlap() {
    let dispatcher = dispatcher(TestContext::default());
    let batch = (0..10).fold(BatchRequest::new(), |batch, i| batch.query("slow", json!(i)));

    let start = std::time::Instant::now();
    let response = dispatcher.dispatch(batch).await.unwrap();

    assert!(response.all_success());
    assert!(start.elapsed() < Duration::from_millis(150));
}

#[tokio::test]
async fn test_dispatch_one_matches_single_element_batch() {
    let dispatcher = dispatcher(TestContext::default());
    let call = Call::query("account.get", json!({"id": "seven"}));

    let single = dispatcher.dispatch_one(call.clone()).await;
    let batch = dispatcher.dispatch(BatchRequest::from(vec![call])).await.unwrap();

    assert_eq!(single, batch.envelopes[0]);
}

#[test]
fn test_shared_signatures_verified() {
    let dispatcher = dispatcher(TestContext::default());
    let good = crate::ProcedureSignature {
        path: "account.get",
        kind: ProcedureKind::Query,
    };
    let wrong_kind = crate::ProcedureSignature {
        path: "account.create",
        kind: ProcedureKind::Query,
    };
    assert!(dispatcher.verify(&[good]).is_ok());
    assert_eq!(dispatcher.verify(&[good, wrong_kind]).unwrap_err().len(), 1);
}

#[tokio::test]
async fn test_malformed_element_fails_only_its_position() {
    let dispatcher = dispatcher(TestContext::default());
    let raw = vec![
        json!({"path": "echo", "type": "query", "input": 1}),
        json!({"path": "echo", "type": "subscription", "input": 2}),
        json!({"type": "query"}),
        json!("not a call"),
        json!({"path": "echo", "type": "query", "input": 5}),
    ];

    let (response, metrics) = dispatcher.dispatch_values_batch(raw).await.unwrap();

    assert_eq!(response.len(), 5);
    assert_eq!(response.envelopes[0], Envelope::Success(json!(1)));
    for envelope in &response.envelopes[1..4] {
        let error = failure(envelope);
        assert_eq!(error.code, RpcErrorCode::BadRequest);
        assert!(error.message.starts_with("Malformed call"));
    }
    assert_eq!(response.envelopes[4], Envelope::Success(json!(5)));
    assert_eq!(metrics.success_count, 2);
    assert_eq!(metrics.error_count, 3);
}

#[tokio::test]
async fn test_raw_batch_size_still_enforced() {
    let config = RpcConfig::new().with_batch_config(BatchConfig::new().with_max_batch_size(1));
    let dispatcher = dispatcher_with(TestContext::default(), config);

    let error = dispatcher
        .dispatch_values(vec![json!("x"), json!("y")])
        .await
        .unwrap_err();
    assert_eq!(error.code, RpcErrorCode::PayloadTooLarge);
}

struct TaggedFactory;

#[async_trait::async_trait]
impl ContextFactory<String> for TaggedFactory {
    async fn create_context(&self) -> RpcResult<String> {
        Ok("untagged".to_string())
    }

    async fn create_context_for_request(&self, request_id: RequestId) -> RpcResult<String> {
        Ok(request_id.to_string())
    }
}

async fn whoami(ctx: Context<String>, _input: ()) -> RpcResult<String> {
    Ok(ctx.inner().clone())
}

#[tokio::test]
async fn test_context_sees_dispatcher_request_id() {
    let router = Router::builder()
        .procedure("whoami", procedure().query(whoami))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::new(router, TaggedFactory, RpcConfig::default()).unwrap();

    let batch = BatchRequest::new()
        .query("whoami", Value::Null)
        .query("whoami", Value::Null);
    let (response, metrics) = dispatcher.dispatch_batch(batch).await.unwrap();

    let expected = Envelope::Success(json!(metrics.request_id.to_string()));
    assert_eq!(response.envelopes, vec![expected.clone(), expected]);

    let (_, next) = dispatcher
        .dispatch_batch(BatchRequest::new().query("whoami", Value::Null))
        .await
        .unwrap();
    assert_ne!(next.request_id, metrics.request_id);
}

async fn lookup(_ctx: Context<TestContext>, input: IdInput) -> RpcResult<u64> {
    Ok(input.id)
}

#[tokio::test]
async fn test_schema_handler_mismatch_is_internal() {
    let router = Router::builder()
        .procedure("loose", procedure().input(Schema::any()).query(lookup))
        .build()
        .unwrap();
    let dispatcher =
        Dispatcher::new(router, CloneContext::new(TestContext::default()), RpcConfig::default())
            .unwrap();

    let response = dispatcher
        .dispatch(
            BatchRequest::new()
                .query("loose", json!({"name": "no id here"}))
                .query("loose", json!({"id": 4})),
        )
        .await
        .unwrap();

    let error = failure(&response.envelopes[0]);
    assert_eq!(error.code, RpcErrorCode::InternalError);
    assert_eq!(error.message, INTERNAL_ERROR_MESSAGE);
    assert!(error.cause.is_none());
    assert_eq!(response.envelopes[1], Envelope::Success(json!(4)));
}

// =============================================================================
// Property-Based Tests
// =============================================================================

#[derive(Debug, Clone)]
enum CallShape {
    Echo(i64),
    Unknown,
    WrongKind,
    Invalid,
}

fn arb_call() -> impl Strategy<Value = CallShape> {
    prop_oneof![
        any::<i64>().prop_map(CallShape::Echo),
        Just(CallShape::Unknown),
        Just(CallShape::WrongKind),
        Just(CallShape::Invalid),
    ]
}

fn to_call(shape: &CallShape) -> Call {
    match shape {
        CallShape::Echo(n) => Call::query("echo", json!({ "n": n })),
        CallShape::Unknown => Call::query("account.nope", Value::Null),
        CallShape::WrongKind => Call::mutation("echo", json!(1)),
        CallShape::Invalid => Call::query("account.get", json!({"id": 0})),
    }
}

/// Property 6: Length and order invariant
/// For any batch, len(response) == len(request) and response[i] answers request[i].
#[test]
fn prop_response_aligned_with_request() {
    proptest!(|(
        shapes in proptest::collection::vec(arb_call(), 0..24),
        parallel in proptest::bool::ANY,
    )| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let config = RpcConfig::new()
            .with_batch_config(BatchConfig::new().with_parallel_execution(parallel));
        let dispatcher = dispatcher_with(TestContext::default(), config);

        let batch = BatchRequest::from(shapes.iter().map(to_call).collect::<Vec<_>>());
        let response = rt.block_on(dispatcher.dispatch(batch)).unwrap();

        prop_assert_eq!(response.len(), shapes.len());
        for (shape, envelope) in shapes.iter().zip(&response.envelopes) {
            match shape {
                CallShape::Echo(n) => {
                    prop_assert_eq!(envelope, &Envelope::Success(json!({ "n": n })));
                }
                CallShape::Unknown => {
                    prop_assert_eq!(failure(envelope).code, RpcErrorCode::NotFound);
                }
                CallShape::WrongKind | CallShape::Invalid => {
                    prop_assert_eq!(failure(envelope).code, RpcErrorCode::BadRequest);
                }
            }
        }
    });
}

/// Property 7: Unknown paths yield NotFound, never a crash
#[test]
fn prop_unknown_paths_not_found() {
    proptest!(|(path in "\\PC{0,32}")| {
        prop_assume!(!["echo", "slow", "explode", "broken"].contains(&path.as_str()));
        prop_assume!(!path.starts_with("account."));

        let rt = tokio::runtime::Runtime::new().unwrap();
        let dispatcher = dispatcher(TestContext::default());
        let envelope = rt.block_on(dispatcher.dispatch_one(Call::query(path, Value::Null)));

        prop_assert_eq!(failure(&envelope).code, RpcErrorCode::NotFound);
    });
}
