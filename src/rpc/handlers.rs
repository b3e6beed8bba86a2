//! RPC Handlers
//!
//! Handlers see validated, deserialized input. Domain failures are returned
//! as `NotFound`, `BadRequest` or `Conflict`; store failures convert through
//! `From<StoreError>` and reach the wire as a sanitized `InternalError`.

use super::context::AppContext;
use super::types::*;
use crate::model::{HealthProfile, NewUser, User, UserChanges, bmi};
use chrono::Utc;
use tracing::{debug, info};
use typed_rpc::{Context, Node, Router, RouterError, RpcError, RpcResult, procedure, router};

// =============================================================================
// Router
// =============================================================================

/// Create the application router
pub fn create_router() -> Result<Router<AppContext>, RouterError> {
    router([
        (
            "health",
            Node::from(procedure().describe("Liveness check").query(health)),
        ),
        ("user", Node::from(user_router()?)),
        ("healthProfile", Node::from(health_profile_router()?)),
    ])
}

/// User sub-router
fn user_router() -> Result<Router<AppContext>, RouterError> {
    Router::builder()
        .procedure("create", procedure().input(create_user_schema()).mutation(create_user))
        .procedure("getById", procedure().input(user_id_schema()).query(get_user))
        .procedure("list", procedure().query(list_users))
        .procedure("update", procedure().input(update_user_schema()).mutation(update_user))
        .procedure("delete", procedure().input(user_id_schema()).mutation(delete_user))
        .build()
}

/// Health profile sub-router
fn health_profile_router() -> Result<Router<AppContext>, RouterError> {
    Router::builder()
        .procedure(
            "getByUserId",
            procedure().input(profile_owner_schema()).query(get_profile),
        )
        .procedure(
            "upsert",
            procedure()
                .input(upsert_profile_schema())
                .describe("Create or replace a profile; BMI is computed")
                .mutation(upsert_profile),
        )
        .procedure(
            "delete",
            procedure().input(profile_owner_schema()).mutation(delete_profile),
        )
        .build()
}

// =============================================================================
// Root Handlers
// =============================================================================

async fn health(_ctx: Context<AppContext>, _: ()) -> RpcResult<HealthStatus> {
    Ok(HealthStatus {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now(),
    })
}

// =============================================================================
// User Handlers
// =============================================================================

async fn create_user(ctx: Context<AppContext>, input: CreateUserInput) -> RpcResult<User> {
    let password_digest = ctx.digest.digest(&input.password);
    let user = ctx
        .store
        .create_user(NewUser {
            email: input.email,
            nickname: input.nickname,
            password_digest,
        })
        .await?;

    info!(request_id = %ctx.request_id.short(), user_id = user.id, "User created");
    Ok(user)
}

async fn get_user(ctx: Context<AppContext>, input: UserIdInput) -> RpcResult<User> {
    ctx.store
        .user(input.id)
        .await?
        .ok_or_else(|| RpcError::not_found(format!("User {} not found", input.id)))
}

async fn list_users(ctx: Context<AppContext>, _: ()) -> RpcResult<Vec<User>> {
    Ok(ctx.store.users().await?)
}

async fn update_user(ctx: Context<AppContext>, input: UpdateUserInput) -> RpcResult<User> {
    let changes = UserChanges {
        nickname: input.nickname,
        email: input.email,
    };
    ctx.store
        .update_user(input.id, changes)
        .await?
        .ok_or_else(|| RpcError::not_found(format!("User {} not found", input.id)))
}

async fn delete_user(ctx: Context<AppContext>, input: UserIdInput) -> RpcResult<Deleted> {
    let deleted = ctx.store.delete_user(input.id).await?;
    debug!(request_id = %ctx.request_id.short(), user_id = input.id, deleted, "User delete");
    Ok(Deleted { deleted })
}

// =============================================================================
// Health Profile Handlers
// =============================================================================

async fn get_profile(
    ctx: Context<AppContext>,
    input: ProfileOwnerInput,
) -> RpcResult<Option<HealthProfile>> {
    Ok(ctx.store.profile(input.user_id).await?)
}

async fn upsert_profile(
    ctx: Context<AppContext>,
    input: UpsertProfileInput,
) -> RpcResult<HealthProfile> {
    let profile = HealthProfile {
        user_id: input.user_id,
        height_cm: input.height_cm,
        weight_kg: input.weight_kg,
        age: input.age,
        activity_level: input.activity_level,
        blood_type: input.blood_type,
        bmi: bmi(input.height_cm, input.weight_kg),
        updated_at: Utc::now(),
    };
    Ok(ctx.store.upsert_profile(profile).await?)
}

async fn delete_profile(ctx: Context<AppContext>, input: ProfileOwnerInput) -> RpcResult<Deleted> {
    let deleted = ctx.store.delete_profile(input.user_id).await?;
    Ok(Deleted { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::api;

    #[test]
    fn test_router_serves_every_shared_reference() {
        let app = create_router().unwrap();
        assert_eq!(app.procedure_count(), api::SIGNATURES.len());
        assert!(app.contract().verify(&api::SIGNATURES).is_ok());
    }

    #[test]
    fn test_contract_output_types() {
        let contract = create_router().unwrap().contract();
        assert_eq!(contract.get("user.getById").unwrap().output, "User");
        assert_eq!(
            contract.get("healthProfile.getByUserId").unwrap().output,
            "Option<HealthProfile>"
        );
        assert_eq!(
            contract.get("health").unwrap().description.as_deref(),
            Some("Liveness check")
        );
    }
}
