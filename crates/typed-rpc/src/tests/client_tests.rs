//! Batching client tests
//!
//! Transports here wrap the in-process dispatcher so the tests can count
//! round trips or inject whole-batch failures.

use super::support::{Account, IdInput, TestContext, dispatcher, dispatcher_with};
use crate::{
    BatchConfig, BatchRequest, BatchResponse, ClientConfig, LocalTransport, ProcedureRef,
    RpcClient, RpcConfig, RpcError, RpcErrorCode, RpcResult, Transport,
};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the size of every batch it forwards.
#[derive(Clone)]
struct Recording {
    inner: LocalTransport<TestContext>,
    sizes: Arc<Mutex<Vec<usize>>>,
}

impl Recording {
    fn new(ctx: TestContext) -> Self {
        Self {
            inner: LocalTransport::new(dispatcher(ctx)),
            sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn sizes(&self) -> Vec<usize> {
        self.sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Recording {
    async fn send(&self, batch: BatchRequest) -> RpcResult<BatchResponse> {
        self.sizes.lock().unwrap().push(batch.len());
        self.inner.send(batch).await
    }
}

/// Fails or misbehaves for the whole batch.
enum Broken {
    Offline,
    DropsLastEnvelope,
    Hangs,
}

#[async_trait]
impl Transport for Broken {
    async fn send(&self, batch: BatchRequest) -> RpcResult<BatchResponse> {
        match self {
            Broken::Offline => Err(RpcError::transport("connection refused")),
            Broken::DropsLastEnvelope => {
                let mut envelopes: Vec<_> = batch
                    .calls
                    .into_iter()
                    .map(|call| crate::Envelope::Success(call.input))
                    .collect();
                envelopes.pop();
                Ok(BatchResponse::new(envelopes))
            }
            Broken::Hangs => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(BatchResponse::default())
            }
        }
    }
}

const ACCOUNT_GET: ProcedureRef<IdInput, Account> = ProcedureRef::query("account.get");

fn create_input(email: &str) -> Value {
    json!({"email": email, "name": "Client"})
}

#[tokio::test]
async fn test_same_tick_calls_share_one_round_trip() {
    let transport = Recording::new(TestContext::default());
    let client = RpcClient::new(transport.clone(), ClientConfig::default()).unwrap();

    let valid = create_input("a@b.com");
    let invalid = create_input("bad");
    let list = json!([1, 2]);
    let (created, invalid, echoed) = tokio::join!(
        client.mutation::<_, Account>("account.create", &valid),
        client.mutation::<_, Account>("account.create", &invalid),
        client.query::<_, Value>("echo", &list),
    );

    assert_eq!(transport.sizes(), vec![3]);
    assert_eq!(created.unwrap().email, "a@b.com");
    let error = invalid.unwrap_err();
    assert_eq!(error.code, RpcErrorCode::BadRequest);
    assert!(!error.field_issues.is_empty());
    assert_eq!(echoed.unwrap(), json!([1, 2]));
}

#[tokio::test]
async fn test_sequential_awaits_use_separate_round_trips() {
    let transport = Recording::new(TestContext::default());
    let client = RpcClient::new(transport.clone(), ClientConfig::default()).unwrap();

    let _: Value = client.query("echo", &json!(1)).await.unwrap();
    let _: Value = client.query("echo", &json!(2)).await.unwrap();

    assert_eq!(transport.sizes(), vec![1, 1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_tick_calls_batch_on_multi_thread_runtime() {
    let transport = Recording::new(TestContext::default());
    let client = RpcClient::new(transport.clone(), ClientConfig::default()).unwrap();

    let rounds = 50;
    for round in 0..rounds {
        let (a, b, c) = (json!(round), json!(round + 1), json!(round + 2));
        let (first, second, third) = tokio::join!(
            client.query::<_, Value>("echo", &a),
            client.query::<_, Value>("echo", &b),
            client.query::<_, Value>("echo", &c),
        );
        assert_eq!(first.unwrap(), a);
        assert_eq!(second.unwrap(), b);
        assert_eq!(third.unwrap(), c);
    }

    assert_eq!(transport.sizes(), vec![3; rounds]);
}

#[tokio::test]
async fn test_window_widens_batch() {
    let transport = Recording::new(TestContext::default());
    let config = ClientConfig::new().with_batch_window(Duration::from_millis(50));
    let client = RpcClient::new(transport.clone(), config).unwrap();

    let first_input = json!("first");
    let (first, second) = tokio::join!(
        client.query::<_, Value>("echo", &first_input),
        async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.query::<_, Value>("echo", &json!("second")).await
        },
    );

    assert_eq!(first.unwrap(), json!("first"));
    assert_eq!(second.unwrap(), json!("second"));
    assert_eq!(transport.sizes(), vec![2]);
}

#[tokio::test]
async fn test_large_batches_are_split() {
    let transport = Recording::new(TestContext::default());
    let config = ClientConfig::new().with_max_batch_size(2);
    let client = RpcClient::new(transport.clone(), config).unwrap();

    let inputs: Vec<Value> = (0..5).map(|i| json!(i)).collect();
    let calls = inputs.iter().map(|input| client.query::<_, Value>("echo", input));
    let results = futures::future::join_all(calls).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), json!(i));
    }
    let mut sizes = transport.sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2, 2]);
}

#[tokio::test]
async fn test_typed_reference_call() {
    let ctx = TestContext::default();
    let client = RpcClient::new(LocalTransport::new(dispatcher(ctx)), ClientConfig::default())
        .unwrap();

    let created: Account = client
        .mutation("account.create", &create_input("typed@x.com"))
        .await
        .unwrap();
    let fetched = client.call(&ACCOUNT_GET, &IdInput { id: created.id }).await.unwrap();
    assert_eq!(fetched, created);

    let missing = client.call(&ACCOUNT_GET, &IdInput { id: 99 }).await.unwrap_err();
    assert_eq!(missing.code, RpcErrorCode::NotFound);
}

#[tokio::test]
async fn test_transport_failure_rejects_every_call() {
    let client = RpcClient::new(Broken::Offline, ClientConfig::default()).unwrap();

    let (one, two) = (json!(1), json!(2));
    let (a, b) = tokio::join!(
        client.query::<_, Value>("echo", &one),
        client.query::<_, Value>("echo", &two),
    );

    for result in [a, b] {
        let error = result.unwrap_err();
        assert_eq!(error.code, RpcErrorCode::TransportError);
        assert_eq!(error.message, "connection refused");
    }
}

#[tokio::test]
async fn test_envelope_count_mismatch_rejects_every_call() {
    let client = RpcClient::new(Broken::DropsLastEnvelope, ClientConfig::default()).unwrap();

    let (one, two) = (json!(1), json!(2));
    let (a, b) = tokio::join!(
        client.query::<_, Value>("echo", &one),
        client.query::<_, Value>("echo", &two),
    );

    assert_eq!(a.unwrap_err().code, RpcErrorCode::TransportError);
    assert_eq!(b.unwrap_err().code, RpcErrorCode::TransportError);
}

#[tokio::test]
async fn test_timeout_rejects_with_timeout_reason() {
    let config = ClientConfig::new().with_request_timeout(Duration::from_millis(20));
    let client = RpcClient::new(Broken::Hangs, config).unwrap();

    let error = client.query::<_, Value>("echo", &json!(1)).await.unwrap_err();

    assert_eq!(error.code, RpcErrorCode::TransportError);
    assert_eq!(error.details.as_ref().unwrap()["reason"], "timeout");
}

#[tokio::test]
async fn test_server_batch_rejection_becomes_transport_error() {
    let server = RpcConfig::new().with_batch_config(BatchConfig::new().with_max_batch_size(2));
    let transport = LocalTransport::new(dispatcher_with(TestContext::default(), server));
    let client = RpcClient::new(transport, ClientConfig::default()).unwrap();

    let inputs: Vec<Value> = (0..3).map(|i| json!(i)).collect();
    let results = futures::future::join_all(
        inputs.iter().map(|input| client.query::<_, Value>("echo", input)),
    )
    .await;

    for result in results {
        let error = result.unwrap_err();
        assert_eq!(error.code, RpcErrorCode::TransportError);
        assert_eq!(error.details.as_ref().unwrap()["code"], "PayloadTooLarge");
    }
}

#[tokio::test]
async fn test_contract_rejects_locally() {
    let ctx = TestContext::default();
    let contract = dispatcher(ctx.clone()).contract().clone();
    let transport = Recording::new(ctx);
    let client = RpcClient::new(transport.clone(), ClientConfig::default())
        .unwrap()
        .with_contract(contract);

    let unknown = client
        .query::<_, Value>("account.remove", &json!({"id": 1}))
        .await
        .unwrap_err();
    let wrong_kind = client
        .query::<_, Value>("account.create", &create_input("a@b.com"))
        .await
        .unwrap_err();

    assert_eq!(unknown.code, RpcErrorCode::NotFound);
    assert_eq!(wrong_kind.code, RpcErrorCode::BadRequest);
    assert!(transport.sizes().is_empty());
}

#[tokio::test]
async fn test_output_type_mismatch_is_transport_error() {
    let client = RpcClient::new(
        LocalTransport::new(dispatcher(TestContext::default())),
        ClientConfig::default(),
    )
    .unwrap();

    let error = client
        .query::<_, Account>("echo", &json!("not an account"))
        .await
        .unwrap_err();
    assert_eq!(error.code, RpcErrorCode::TransportError);
}

#[test]
fn test_invalid_client_config_rejected() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let result = RpcClient::new(Broken::Offline, ClientConfig::new().with_max_batch_size(0));
        assert!(result.is_err());
    });
}
