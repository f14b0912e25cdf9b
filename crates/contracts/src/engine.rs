//! CryptoEngine trait - collaborator interface to the hardware engine
//!
//! The register-level driver (descriptor building, DMA, the transform
//! itself) lives behind this trait and is out of scope for the dispatcher.

use crate::{ChannelId, Command, ContractError, PollOutcome, RequestId};

/// A command as handed to one engine channel
#[derive(Debug, Clone)]
pub struct EngineRequest {
    /// Sequence number the engine must echo in the completion
    /// (`None` when the dispatcher runs a single channel)
    pub request_id: Option<RequestId>,

    /// The caller's command
    pub command: Command,
}

/// Engine with independent execution channels
///
/// Each channel processes commands asynchronously and reports them in
/// program order. Different channels complete independently of each other.
/// Both methods must be non-blocking; they may be called concurrently from
/// the submission path and from per-channel poll paths.
pub trait CryptoEngine: Send + Sync {
    /// Number of execution channels the engine exposes
    fn channel_count(&self) -> usize;

    /// Queue a request on `channel`
    ///
    /// # Errors
    /// Returns the engine's refusal unchanged; the dispatcher never retries.
    fn submit(&self, channel: ChannelId, request: EngineRequest) -> Result<(), ContractError>;

    /// Fetch the next completed request of `channel`, if any
    fn poll(&self, channel: ChannelId) -> PollOutcome;
}

impl<E: CryptoEngine + ?Sized> CryptoEngine for std::sync::Arc<E> {
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn submit(&self, channel: ChannelId, request: EngineRequest) -> Result<(), ContractError> {
        (**self).submit(channel, request)
    }

    fn poll(&self, channel: ChannelId) -> PollOutcome {
        (**self).poll(channel)
    }
}
