//! Request id sequencer (multi-channel mode only)

use contracts::RequestId;

/// Wraparound submission counter
#[derive(Debug, Clone)]
pub struct Sequencer {
    next: RequestId,
    capacity: RequestId,
}

impl Sequencer {
    /// `capacity` is the reorder capacity; ids wrap modulo it.
    pub fn new(capacity: usize) -> Self {
        Self {
            next: 0,
            capacity: RequestId::try_from(capacity.max(1)).unwrap_or(RequestId::MAX),
        }
    }

    /// Return the current id, then advance
    #[inline]
    pub fn next_request_id(&mut self) -> RequestId {
        let id = self.next;
        self.next = (self.next + 1) % self.capacity;
        id
    }

    /// Step back over the last issued id
    #[inline]
    pub fn rewind(&mut self) {
        self.next = if self.next == 0 {
            self.capacity - 1
        } else {
            self.next - 1
        };
    }

    /// Id the next submission will receive
    pub fn peek(&self) -> RequestId {
        self.next
    }
}
