//! Vitals
//!
//! Users and their health profiles, served over the typed-rpc batching
//! layer. The binary wires an in-memory store and a salted digest into
//! [`rpc::create_dispatcher`] and serves it over HTTP.

pub mod digest;
pub mod model;
pub mod rpc;
pub mod store;

pub use digest::{Digest, Sha256Digest};
pub use model::{ActivityLevel, BloodType, HealthProfile, User};
pub use rpc::{AppContext, AppContextFactory, StartupError, create_dispatcher, create_router};
pub use store::{MemoryStore, Persistence, StoreError};
