//! Tests for router composition

use crate::router::{Node, Router, RouterError, router};
use crate::{Context, EmptyContext, ProcedureKind, RpcResult, Schema, procedure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct GreetInput {
    name: String,
}

#[derive(Debug, Serialize)]
struct Greeting {
    message: String,
}

async fn greet(_ctx: Context<EmptyContext>, input: GreetInput) -> RpcResult<Greeting> {
    Ok(Greeting {
        message: format!("Hello, {}!", input.name),
    })
}

async fn ping(_ctx: Context<EmptyContext>, _input: ()) -> RpcResult<&'static str> {
    Ok("pong")
}

fn greet_schema() -> Schema {
    Schema::object().field("name", Schema::string().min_length(1))
}

#[test]
fn test_builder_keeps_insertion_order() {
    let app = Router::builder()
        .procedure("zeta", procedure().query(ping))
        .procedure("alpha", procedure().query(ping))
        .procedure("mid", procedure().input(greet_schema()).mutation(greet))
        .build()
        .unwrap();

    let segments: Vec<_> = app.entries().map(|(segment, _)| segment).collect();
    assert_eq!(segments, vec!["zeta", "alpha", "mid"]);
    assert_eq!(app.procedure_count(), 3);
}

#[test]
fn test_router_function_matches_builder() {
    let greetings = Router::builder()
        .procedure("hello", procedure().input(greet_schema()).query(greet))
        .build()
        .unwrap();

    let app = router([
        ("ping", Node::from(procedure().query(ping))),
        ("greetings", Node::from(greetings)),
    ])
    .unwrap();

    assert_eq!(app.paths(), vec!["ping", "greetings.hello"]);
}

#[test]
fn test_duplicate_segment_rejected() {
    let result = Router::<EmptyContext>::builder()
        .procedure("ping", procedure().query(ping))
        .procedure("ping", procedure().mutation(ping))
        .build();

    assert!(matches!(
        result,
        Err(RouterError::DuplicateSegment { ref segment }) if segment == "ping"
    ));
}

#[test]
fn test_duplicate_between_router_and_procedure_rejected() {
    let nested = Router::builder()
        .procedure("ping", procedure().query(ping))
        .build()
        .unwrap();

    let result = Router::builder()
        .procedure("user", procedure().query(ping))
        .nest("user", nested)
        .build();

    assert!(matches!(result, Err(RouterError::DuplicateSegment { .. })));
}

#[test]
fn test_malformed_segments_rejected() {
    for bad in ["", "user.get", "user-get", "naïve", "with space"] {
        let result = Router::<EmptyContext>::builder()
            .procedure(bad, procedure().query(ping))
            .build();
        assert!(
            matches!(result, Err(RouterError::InvalidSegment { .. })),
            "segment {:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_underscore_and_digits_allowed() {
    let app = Router::<EmptyContext>::builder()
        .procedure("get_by_id2", procedure().query(ping))
        .build()
        .unwrap();
    assert!(app.resolve("get_by_id2").is_ok());
}

#[test]
fn test_nested_kinds_survive_composition() {
    let user = Router::builder()
        .procedure("get", procedure().input(greet_schema()).query(greet))
        .procedure("create", procedure().input(greet_schema()).mutation(greet))
        .build()
        .unwrap();
    let app = Router::builder().nest("user", user).build().unwrap();

    let kinds: Vec<_> = app
        .procedures()
        .into_iter()
        .map(|(path, procedure)| (path, procedure.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("user.get".to_string(), ProcedureKind::Query),
            ("user.create".to_string(), ProcedureKind::Mutation),
        ]
    );
}

#[test]
fn test_error_messages() {
    let err = RouterError::InvalidSegment {
        segment: "a.b".to_string(),
        reason: "segment cannot contain '.'".to_string(),
    };
    assert_eq!(err.to_string(), "invalid segment 'a.b': segment cannot contain '.'");
}
