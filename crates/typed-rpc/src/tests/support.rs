//! Shared fixtures: a small account router over an in-memory map.

use crate::{
    CloneContext, Context, Dispatcher, RpcConfig, RpcError, RpcResult, Schema, procedure,
    router::Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct TestContext {
    pub accounts: Arc<RwLock<HashMap<u64, Account>>>,
    pub handler_calls: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccount {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdInput {
    pub id: u64,
}

pub fn create_schema() -> Schema {
    Schema::object()
        .field("email", Schema::string().email())
        .field("name", Schema::string().min_length(2).max_length(16))
}

pub fn id_schema() -> Schema {
    Schema::object().field("id", Schema::integer().min(1.0))
}

async fn create(ctx: Context<TestContext>, input: CreateAccount) -> RpcResult<Account> {
    ctx.handler_calls.fetch_add(1, Ordering::SeqCst);
    let mut accounts = ctx.accounts.write().await;
    if accounts.values().any(|a| a.email == input.email) {
        return Err(RpcError::conflict("Email already registered"));
    }
    let account = Account {
        id: accounts.len() as u64 + 1,
        email: input.email,
        name: input.name,
    };
    accounts.insert(account.id, account.clone());
    Ok(account)
}

async fn get(ctx: Context<TestContext>, input: IdInput) -> RpcResult<Account> {
    ctx.handler_calls.fetch_add(1, Ordering::SeqCst);
    ctx.accounts
        .read()
        .await
        .get(&input.id)
        .cloned()
        .ok_or_else(|| RpcError::not_found(format!("Account {} not found", input.id)))
}

async fn find(ctx: Context<TestContext>, input: IdInput) -> RpcResult<Option<Account>> {
    Ok(ctx.accounts.read().await.get(&input.id).cloned())
}

async fn echo(_ctx: Context<TestContext>, input: Value) -> RpcResult<Value> {
    Ok(input)
}

async fn explode(_ctx: Context<TestContext>, _input: ()) -> RpcResult<()> {
    panic!("handler exploded");
}

async fn broken(_ctx: Context<TestContext>, _input: ()) -> RpcResult<()> {
    Err(RpcError::internal("connection to db-primary:5432 refused").with_cause("ECONNREFUSED"))
}

async fn slow(_ctx: Context<TestContext>, input: Value) -> RpcResult<Value> {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    Ok(input)
}

pub fn test_router() -> Router<TestContext> {
    let account = Router::builder()
        .procedure("create", procedure().input(create_schema()).mutation(create))
        .procedure("get", procedure().input(id_schema()).query(get))
        .procedure("find", procedure().input(id_schema()).query(find))
        .build()
        .unwrap();

    Router::builder()
        .procedure("echo", procedure().input(Schema::any()).query(echo))
        .procedure("slow", procedure().input(Schema::any()).query(slow))
        .procedure("explode", procedure().query(explode))
        .procedure("broken", procedure().mutation(broken))
        .nest("account", account)
        .build()
        .unwrap()
}

pub fn dispatcher_with(ctx: TestContext, config: RpcConfig) -> Arc<Dispatcher<TestContext>> {
    Arc::new(Dispatcher::new(test_router(), CloneContext::new(ctx), config).unwrap())
}

pub fn dispatcher(ctx: TestContext) -> Arc<Dispatcher<TestContext>> {
    dispatcher_with(ctx, RpcConfig::default())
}
