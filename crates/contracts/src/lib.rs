//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the dispatch workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Ordering model
//! - A `RequestId` is the submission-order sequence number, wrapping modulo
//!   the reorder capacity
//! - Channels complete out of order relative to each other, but each engine
//!   channel preserves program order

mod blueprint;
mod command;
mod completion;
mod engine;
mod error;
mod policy;

pub use blueprint::*;
pub use command::*;
pub use completion::*;
pub use engine::{CryptoEngine, EngineRequest};
pub use error::*;
pub use policy::*;

/// Engine channel index (`0..channels`)
pub type ChannelId = usize;

/// Submission-order sequence number
pub type RequestId = u32;
