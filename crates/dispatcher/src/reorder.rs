//! Completion reorder buffer.
//!
//! Fixed-capacity slot array indexed by `request_id mod capacity`:
//! - `insert` parks a completion in its slot; an occupied slot is refused
//! - `try_release_next` hands out the slot under the single cursor, in
//!   strict request id order
//!
//! Capacity never changes after construction.

use std::fmt;

use contracts::{Completion, RequestId};

use crate::error::DispatcherError;

/// Reorder buffer over wraparound request ids
pub struct ReorderBuffer {
    slots: Vec<Option<Completion>>,
    /// Slot of the next id to release
    cursor: usize,
    /// Occupied slot count
    buffered: usize,
}

impl fmt::Debug for ReorderBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReorderBuffer")
            .field("capacity", &self.slots.len())
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffered)
            .finish()
    }
}

impl ReorderBuffer {
    /// Create an empty buffer; `capacity` must be non-zero
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
            cursor: 0,
            buffered: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Park `completion` under `request_id`
    ///
    /// # Errors
    /// `ProtocolViolation` if the slot is still occupied; the occupant is kept.
    pub fn insert(
        &mut self,
        request_id: RequestId,
        completion: Completion,
    ) -> Result<(), DispatcherError> {
        let slot = self.slot_of(request_id);
        match &mut self.slots[slot] {
            Some(_) => Err(DispatcherError::ProtocolViolation { request_id, slot }),
            empty => {
                *empty = Some(completion);
                self.buffered += 1;
                Ok(())
            }
        }
    }

    /// Release the completion under the cursor, if it has arrived
    #[inline]
    pub fn try_release_next(&mut self) -> Option<Completion> {
        let completion = self.slots[self.cursor].take()?;
        self.cursor = (self.cursor + 1) % self.slots.len();
        self.buffered -= 1;
        Some(completion)
    }

    /// Request id the cursor is waiting for
    #[inline]
    pub fn next_expected(&self) -> RequestId {
        // capacity is validated to fit RequestId
        self.cursor as RequestId
    }

    /// Whether the slot for `request_id` is occupied
    pub fn is_occupied(&self, request_id: RequestId) -> bool {
        self.slots[self.slot_of(request_id)].is_some()
    }

    /// Completions waiting for release
    #[inline]
    pub fn len(&self) -> usize {
        self.buffered
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    #[inline]
    fn slot_of(&self, request_id: RequestId) -> usize {
        request_id as usize % self.slots.len()
    }
}
