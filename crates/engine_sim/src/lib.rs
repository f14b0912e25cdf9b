//! # Engine Sim
//!
//! In-memory stand-in for the multi-channel crypto engine.
//!
//! Responsibilities:
//! - Per-channel FIFO queues (program order preserved within a channel)
//! - Manual completion control for deterministic tests
//! - Poll-count latency model for the CLI workload
//! - Failure injection (refused submissions, failed result codes)

mod mock;

pub use mock::{CompletionMode, MockEngine, MockEngineConfig};
