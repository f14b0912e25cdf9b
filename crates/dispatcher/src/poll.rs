//! Channel poll adapter
//!
//! Drains one engine channel into the reorder buffer, then tries to release
//! the next expected completion. Each channel carries a "may still have
//! pending completions" flag so a channel known to be empty is not polled
//! again until a release attempt comes up short.

use contracts::{ChannelId, CryptoEngine, PollOutcome};
use tracing::{error, trace};

use crate::error::DispatcherError;
use crate::reorder::ReorderBuffer;

/// Per-channel drain state plus the shared reorder buffer
#[derive(Debug)]
pub struct ChannelPollAdapter {
    pending: Vec<bool>,
    reorder: ReorderBuffer,
}

impl ChannelPollAdapter {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            pending: vec![true; channels],
            reorder: ReorderBuffer::new(capacity),
        }
    }

    /// One "give me a completion" request on `channel`
    ///
    /// `on_complete` is called with `(channel, size)` for every completion
    /// drained from the engine, before it is buffered.
    ///
    /// # Errors
    /// A protocol violation while buffering a drained completion. The
    /// offending completion is refused; the rest of the buffer is intact.
    pub fn poll<E, F>(
        &mut self,
        channel: ChannelId,
        engine: &E,
        mut on_complete: F,
    ) -> Result<PollOutcome, DispatcherError>
    where
        E: CryptoEngine + ?Sized,
        F: FnMut(ChannelId, u64),
    {
        if self.pending[channel] {
            self.drain(channel, engine, &mut on_complete)?;
        }

        match self.reorder.try_release_next() {
            Some(completion) => Ok(PollOutcome::Ready(completion)),
            None => {
                // Re-arm the polled channel, even when another channel holds
                // the next expected id.
                self.pending[channel] = true;
                Ok(PollOutcome::NotReady)
            }
        }
    }

    fn drain<E, F>(
        &mut self,
        channel: ChannelId,
        engine: &E,
        on_complete: &mut F,
    ) -> Result<(), DispatcherError>
    where
        E: CryptoEngine + ?Sized,
        F: FnMut(ChannelId, u64),
    {
        loop {
            let completion = match engine.poll(channel) {
                PollOutcome::NotReady => {
                    self.pending[channel] = false;
                    return Ok(());
                }
                PollOutcome::Ready(completion) => completion,
            };

            on_complete(channel, completion.size);

            let Some(request_id) = completion.request_id else {
                error!(channel, context = completion.context, "Untagged completion refused");
                return Err(DispatcherError::UntaggedCompletion { channel });
            };
            trace!(channel, request_id, "Drained completion");

            if let Err(e) = self.reorder.insert(request_id, completion) {
                error!(channel, request_id, error = %e, "Reorder insert refused");
                return Err(e);
            }
        }
    }

    /// Whether `channel` will be drained on its next poll
    pub fn is_pending(&self, channel: ChannelId) -> bool {
        self.pending.get(channel).copied().unwrap_or(false)
    }

    pub fn reorder(&self) -> &ReorderBuffer {
        &self.reorder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{Command, EngineRequest, RequestId};
    use engine_sim::MockEngine;

    fn submit(engine: &MockEngine, channel: ChannelId, request_id: RequestId) {
        engine
            .submit(
                channel,
                EngineRequest {
                    request_id: Some(request_id),
                    command: Command::new(Bytes::from_static(b"0123456789"), request_id as u64),
                },
            )
            .unwrap();
    }

    fn released_id(outcome: PollOutcome) -> Option<RequestId> {
        outcome.into_completion().and_then(|c| c.request_id)
    }

    #[test]
    fn test_buffers_until_next_expected_arrives() {
        let engine = MockEngine::manual(2);
        let mut adapter = ChannelPollAdapter::new(2, 8);
        submit(&engine, 0, 0);
        submit(&engine, 1, 1);

        engine.complete(1, 1);
        let outcome = adapter.poll(1, &engine, |_, _| {}).unwrap();
        assert_eq!(outcome, PollOutcome::NotReady);
        assert_eq!(adapter.reorder().len(), 1);

        engine.complete(0, 1);
        assert_eq!(released_id(adapter.poll(0, &engine, |_, _| {}).unwrap()), Some(0));
        assert_eq!(released_id(adapter.poll(0, &engine, |_, _| {}).unwrap()), Some(1));
    }

    #[test]
    fn test_flag_cleared_after_drain_and_rearmed_on_not_ready() {
        let engine = MockEngine::manual(2);
        let mut adapter = ChannelPollAdapter::new(2, 8);
        submit(&engine, 0, 0);
        engine.complete(0, 1);

        assert!(adapter.is_pending(0));
        assert!(adapter.poll(0, &engine, |_, _| {}).unwrap().is_ready());
        // drained to not-ready, release succeeded: flag stays down
        assert!(!adapter.is_pending(0));

        assert_eq!(adapter.poll(0, &engine, |_, _| {}).unwrap(), PollOutcome::NotReady);
        assert!(adapter.is_pending(0));
    }

    #[test]
    fn test_polled_channel_rearmed_while_other_channel_holds_next() {
        let engine = MockEngine::manual(2);
        let mut adapter = ChannelPollAdapter::new(2, 8);
        submit(&engine, 0, 0);
        submit(&engine, 1, 1);
        engine.complete(1, 1);

        // channel 1 drains id 1, which must wait for id 0 on channel 0
        assert_eq!(adapter.poll(1, &engine, |_, _| {}).unwrap(), PollOutcome::NotReady);
        assert_eq!(engine.pending(1), 0);
        assert!(adapter.is_pending(1));
        assert!(adapter.is_pending(0));

        // polling the now empty channel again keeps it armed
        assert_eq!(adapter.poll(1, &engine, |_, _| {}).unwrap(), PollOutcome::NotReady);
        assert!(adapter.is_pending(1));

        engine.complete(0, 1);
        assert_eq!(released_id(adapter.poll(0, &engine, |_, _| {}).unwrap()), Some(0));
        assert_eq!(released_id(adapter.poll(0, &engine, |_, _| {}).unwrap()), Some(1));
    }

    #[test]
    fn test_on_complete_sees_every_drained_completion() {
        let engine = MockEngine::manual(1);
        let mut adapter = ChannelPollAdapter::new(1, 4);
        submit(&engine, 0, 0);
        submit(&engine, 0, 1);
        engine.complete(0, 2);

        let mut drained = Vec::new();
        adapter
            .poll(0, &engine, |channel, size| drained.push((channel, size)))
            .unwrap();
        assert_eq!(drained, vec![(0, 10), (0, 10)]);
    }

    #[test]
    fn test_slot_collision_is_reported() {
        let engine = MockEngine::manual(1);
        let mut adapter = ChannelPollAdapter::new(1, 2);
        submit(&engine, 0, 1);
        submit(&engine, 0, 3); // aliases slot 1
        engine.complete(0, 2);

        let err = adapter.poll(0, &engine, |_, _| {}).unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::ProtocolViolation {
                request_id: 3,
                slot: 1
            }
        ));
        assert_eq!(adapter.reorder().len(), 1);
    }

    #[test]
    fn test_untagged_completion_is_reported() {
        let engine = MockEngine::manual(1);
        let mut adapter = ChannelPollAdapter::new(1, 2);
        engine
            .submit(
                0,
                EngineRequest {
                    request_id: None,
                    command: Command::new(Bytes::new(), 0),
                },
            )
            .unwrap();
        engine.complete(0, 1);

        let err = adapter.poll(0, &engine, |_, _| {}).unwrap_err();
        assert!(matches!(err, DispatcherError::UntaggedCompletion { channel: 0 }));
    }
}
