//! Shared procedure references
//!
//! Clients call through these constants; the server checks at startup that
//! every one of them resolves with the declared kind.

use super::types::*;
use crate::model::{HealthProfile, User};
use typed_rpc::{ProcedureRef, ProcedureSignature};

pub const HEALTH: ProcedureRef<(), HealthStatus> = ProcedureRef::query("health");

pub const USER_CREATE: ProcedureRef<CreateUserInput, User> = ProcedureRef::mutation("user.create");
pub const USER_GET_BY_ID: ProcedureRef<UserIdInput, User> = ProcedureRef::query("user.getById");
pub const USER_LIST: ProcedureRef<(), Vec<User>> = ProcedureRef::query("user.list");
pub const USER_UPDATE: ProcedureRef<UpdateUserInput, User> = ProcedureRef::mutation("user.update");
pub const USER_DELETE: ProcedureRef<UserIdInput, Deleted> = ProcedureRef::mutation("user.delete");

pub const HEALTH_PROFILE_GET_BY_USER_ID: ProcedureRef<ProfileOwnerInput, Option<HealthProfile>> =
    ProcedureRef::query("healthProfile.getByUserId");
pub const HEALTH_PROFILE_UPSERT: ProcedureRef<UpsertProfileInput, HealthProfile> =
    ProcedureRef::mutation("healthProfile.upsert");
pub const HEALTH_PROFILE_DELETE: ProcedureRef<ProfileOwnerInput, Deleted> =
    ProcedureRef::mutation("healthProfile.delete");

/// Every shared reference, for startup verification.
pub const SIGNATURES: [ProcedureSignature; 9] = [
    HEALTH.signature(),
    USER_CREATE.signature(),
    USER_GET_BY_ID.signature(),
    USER_LIST.signature(),
    USER_UPDATE.signature(),
    USER_DELETE.signature(),
    HEALTH_PROFILE_GET_BY_USER_ID.signature(),
    HEALTH_PROFILE_UPSERT.signature(),
    HEALTH_PROFILE_DELETE.signature(),
];
