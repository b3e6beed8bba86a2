//! Persistence
//!
//! Handlers reach storage only through [`Persistence`], which the context
//! carries as an opaque handle. [`MemoryStore`] is the in-process
//! implementation used by the server binary and the tests.

use crate::model::{HealthProfile, NewUser, User, UserChanges};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use typed_rpc::RpcError;

/// Storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another user already has this email
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),
    /// Referenced user does not exist
    #[error("user {0} does not exist")]
    UserNotFound(u64),
    /// Backend cannot serve requests
    #[error("store is unavailable")]
    Unavailable,
}

impl From<StoreError> for RpcError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateEmail(_) => RpcError::conflict("Email is already registered"),
            StoreError::UserNotFound(id) => RpcError::not_found(format!("User {} not found", id)),
            StoreError::Unavailable => {
                RpcError::internal("Storage failure").with_cause(error.to_string())
            }
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity-keyed storage operations.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// Whether the backend can serve requests right now.
    async fn is_available(&self) -> bool;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user(&self, id: u64) -> StoreResult<Option<User>>;
    /// All users in id order.
    async fn users(&self) -> StoreResult<Vec<User>>;
    async fn update_user(&self, id: u64, changes: UserChanges) -> StoreResult<Option<User>>;
    /// Removes the user and their health profile.
    async fn delete_user(&self, id: u64) -> StoreResult<bool>;
    async fn password_digest(&self, id: u64) -> StoreResult<Option<String>>;

    async fn profile(&self, user_id: u64) -> StoreResult<Option<HealthProfile>>;
    /// Fails with `UserNotFound` when the owner does not exist.
    async fn upsert_profile(&self, profile: HealthProfile) -> StoreResult<HealthProfile>;
    async fn delete_profile(&self, user_id: u64) -> StoreResult<bool>;
}

// =============================================================================
// In-memory store
// =============================================================================

struct StoredUser {
    user: User,
    password_digest: String,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<u64, StoredUser>,
    profiles: BTreeMap<u64, HealthProfile>,
    next_id: u64,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<u64>) -> bool {
        self.users
            .values()
            .any(|stored| stored.user.email.eq_ignore_ascii_case(email) && Some(stored.user.id) != except)
    }
}

/// Async-safe in-memory store on `tokio::sync::RwLock`.
///
/// Reads run concurrently; writes take the lock exclusively, which keeps
/// the email uniqueness check and the insert atomic.
#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    available: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                next_id: 1,
                ..Tables::default()
            })),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Mark the backend up or down. Clones share the flag.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        if tables.email_taken(&new.email, None) {
            return Err(StoreError::DuplicateEmail(new.email));
        }

        let id = tables.next_id;
        tables.next_id += 1;
        let user = User {
            id,
            email: new.email,
            nickname: new.nickname,
            created_at: Utc::now(),
        };
        tables.users.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_digest: new.password_digest,
            },
        );
        debug!(user_id = id, "User stored");
        Ok(user)
    }

    async fn user(&self, id: u64) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn users(&self) -> StoreResult<Vec<User>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.values().map(|stored| stored.user.clone()).collect())
    }

    async fn update_user(&self, id: u64, changes: UserChanges) -> StoreResult<Option<User>> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email
            && tables.email_taken(email, Some(id))
        {
            return Err(StoreError::DuplicateEmail(email.clone()));
        }

        let Some(stored) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(nickname) = changes.nickname {
            stored.user.nickname = nickname;
        }
        if let Some(email) = changes.email {
            stored.user.email = email;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete_user(&self, id: u64) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(&id).is_some();
        if removed {
            tables.profiles.remove(&id);
            debug!(user_id = id, "User and profile removed");
        }
        Ok(removed)
    }

    async fn password_digest(&self, id: u64) -> StoreResult<Option<String>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|stored| stored.password_digest.clone()))
    }

    async fn profile(&self, user_id: u64) -> StoreResult<Option<HealthProfile>> {
        self.ensure_available()?;
        let tables = self.tables.read().await;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: HealthProfile) -> StoreResult<HealthProfile> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(StoreError::UserNotFound(profile.user_id));
        }
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn delete_profile(&self, user_id: u64) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut tables = self.tables.write().await;
        Ok(tables.profiles.remove(&user_id).is_some())
    }
}
