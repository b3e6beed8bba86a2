//! Router trees
//!
//! A [`Router`] is an ordered mapping from path segment to either a nested
//! router or a [`Procedure`](crate::Procedure). Routers are composed once at
//! startup by pure functions and are immutable afterwards:
//!
//! ```rust,ignore
//! let user = Router::builder()
//!     .procedure("create", create_user())
//!     .procedure("getById", get_user())
//!     .build()?;
//!
//! let app = Router::builder()
//!     .procedure("health", health())
//!     .nest("user", user)
//!     .build()?;
//!
//! let procedure = app.resolve("user.getById")?;
//! ```
//!
//! Composition errors (duplicate or malformed segments) surface from
//! `build()` as [`RouterError`], never at call time.

mod builder;
mod core;

pub use builder::{RouterBuilder, RouterError, router};
pub use core::{Node, Router};

#[cfg(test)]
mod tests;
