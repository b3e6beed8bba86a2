//! Procedure inputs and outputs, with the schemas that guard them
//!
//! Each input type has a schema function next to it. The dispatcher
//! validates the raw JSON against the schema before the handler sees the
//! deserialized value.

use crate::model::{ActivityLevel, BloodType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_rpc::Schema;

// =============================================================================
// General Types
// =============================================================================

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of a delete mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

// =============================================================================
// User Types
// =============================================================================

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

pub fn create_user_schema() -> Schema {
    Schema::object()
        .field("email", Schema::string().email())
        .field("nickname", nickname())
        .field("password", Schema::string().min_length(6))
}

/// Input for addressing one user
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserIdInput {
    pub id: u64,
}

pub fn user_id_schema() -> Schema {
    Schema::object().field("id", id())
}

/// Input for updating a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub fn update_user_schema() -> Schema {
    Schema::object()
        .field("id", id())
        .field("nickname", nickname().optional())
        .field("email", Schema::string().email().optional())
}

// =============================================================================
// Health Profile Types
// =============================================================================

/// Input for addressing one user's profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOwnerInput {
    pub user_id: u64,
}

pub fn profile_owner_schema() -> Schema {
    Schema::object().field("userId", id())
}

/// Input for creating or replacing a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileInput {
    pub user_id: u64,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub age: u32,
    pub activity_level: ActivityLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<BloodType>,
}

pub fn upsert_profile_schema() -> Schema {
    Schema::object()
        .field("userId", id())
        .field("heightCm", Schema::number().positive().max(300.0))
        .field("weightKg", Schema::number().positive().max(700.0))
        .field("age", Schema::integer().positive().max(150.0))
        .field("activityLevel", Schema::enumeration(ActivityLevel::NAMES))
        .field("bloodType", Schema::enumeration(BloodType::NAMES).optional())
}

fn id() -> Schema {
    Schema::integer().min(1.0)
}

fn nickname() -> Schema {
    Schema::string().min_length(2).max_length(32)
}
