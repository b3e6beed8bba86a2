//! Tests for dotted path resolution

use crate::router::Router;
use crate::{Context, EmptyContext, RpcErrorCode, RpcResult, Schema, procedure};
use serde_json::{Value, json};

async fn echo(_ctx: Context<EmptyContext>, input: Value) -> RpcResult<Value> {
    Ok(input)
}

fn app() -> Router<EmptyContext> {
    let profile = Router::builder()
        .procedure("get", procedure().input(Schema::any()).query(echo))
        .build()
        .unwrap();
    let user = Router::builder()
        .procedure("list", procedure().query(echo))
        .nest("profile", profile)
        .build()
        .unwrap();
    Router::builder()
        .procedure("health", procedure().query(echo))
        .nest("user", user)
        .build()
        .unwrap()
}

#[test]
fn test_resolves_every_depth() {
    let app = app();
    assert!(app.resolve("health").is_ok());
    assert!(app.resolve("user.list").is_ok());
    assert!(app.resolve("user.profile.get").is_ok());
}

#[test]
fn test_missing_segment_is_not_found() {
    let err = app().resolve("user.remove").unwrap_err();
    assert_eq!(err.code, RpcErrorCode::NotFound);
    assert_eq!(err.message, "Procedure 'user.remove' not found");
}

#[test]
fn test_router_terminal_is_not_found() {
    let err = app().resolve("user.profile").unwrap_err();
    assert_eq!(err.code, RpcErrorCode::NotFound);
}

#[test]
fn test_walking_through_procedure_is_not_found() {
    let err = app().resolve("health.deep").unwrap_err();
    assert_eq!(err.code, RpcErrorCode::NotFound);
}

#[test]
fn test_malformed_paths_are_not_found() {
    let app = app();
    for path in ["", ".", "user.", ".health", "user..list", "user/list"] {
        let err = app.resolve(path).unwrap_err();
        assert_eq!(err.code, RpcErrorCode::NotFound, "path {:?}", path);
    }
}

#[tokio::test]
async fn test_resolved_procedure_runs() {
    let app = app();
    let procedure = app.resolve("user.profile.get").unwrap();
    let output = procedure
        .call(Context::new(EmptyContext), json!({"id": 7}))
        .await
        .unwrap();
    assert_eq!(output, json!({"id": 7}));
}
