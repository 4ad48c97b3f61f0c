//! Logging setup for agent-crew binaries and tests.
//!
//! Wraps `tracing-subscriber` so every entry point initialises the same
//! filter and formatting rules: `RUST_LOG` wins when present, otherwise the
//! configured default level applies.

pub mod logging;
