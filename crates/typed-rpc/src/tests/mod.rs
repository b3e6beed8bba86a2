//! Test module for typed-rpc
//!
//! Cross-module behavior: schema validation through procedures, batch
//! dispatch, the batching client, configuration and logging helpers.
//! Property-based tests use proptest.

#[cfg(test)]
pub mod support;


#[cfg(test)]
pub mod dispatch_tests;

#[cfg(test)]
pub mod client_tests;


#[cfg(test)]
pub mod logging_tests;
