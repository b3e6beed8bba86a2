//! Router composition and resolution tests

mod builder_tests;
mod resolve_tests;
