//! Completion tickets for queued store operations.
//!
//! # Responsibility
//! - Carry exactly one operation outcome from the worker back to the caller.
//!
//! # Invariants
//! - Single assignment: a slot is completed at most once, by value.
//! - Dropping a ticket abandons the outcome but never cancels the queued
//!   operation.

use super::{StoreError, StoreResult};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};

/// Creates one linked slot/ticket pair for a single operation.
pub(crate) fn pending_pair<T>() -> (CompletionSlot<T>, PendingOp<T>) {
    let (sender, receiver) = sync_channel(1);
    (CompletionSlot { sender }, PendingOp { receiver })
}

/// Typed completion ticket for one queued store operation.
///
/// The operation runs on the store worker whether or not anyone holds the
/// ticket. Waiting is opt-in and is the only blocking point in the API.
pub struct PendingOp<T> {
    receiver: Receiver<StoreResult<T>>,
}

impl<T> PendingOp<T> {
    /// Blocks until the operation completes and returns its outcome.
    ///
    /// Resolves to `StoreError::WorkerClosed` when the worker shut down
    /// before completing the operation.
    pub fn wait(self) -> StoreResult<T> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(StoreError::WorkerClosed))
    }

    /// Polls for the outcome without blocking.
    ///
    /// Hands the ticket back via `Err` while the operation is still in
    /// flight, so the caller can poll again later.
    pub fn try_wait(self) -> Result<StoreResult<T>, Self> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(StoreError::WorkerClosed)),
        }
    }
}

/// Worker-side half of a ticket.
pub(crate) struct CompletionSlot<T> {
    sender: SyncSender<StoreResult<T>>,
}

impl<T> CompletionSlot<T> {
    /// Delivers the outcome. A dropped ticket is not an error.
    pub(crate) fn complete(self, outcome: StoreResult<T>) {
        let _ = self.sender.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::{pending_pair, StoreError};

    #[test]
    fn completed_slot_resolves_ticket() {
        let (slot, pending) = pending_pair::<i64>();
        slot.complete(Ok(7));
        assert_eq!(pending.wait().unwrap(), 7);
    }

    #[test]
    fn dropped_slot_reports_worker_closed() {
        let (slot, pending) = pending_pair::<()>();
        drop(slot);
        assert!(matches!(pending.wait(), Err(StoreError::WorkerClosed)));
    }

    #[test]
    fn try_wait_returns_ticket_while_in_flight() {
        let (slot, pending) = pending_pair::<bool>();
        let pending = match pending.try_wait() {
            Err(pending) => pending,
            Ok(_) => panic!("outcome must not be ready yet"),
        };
        slot.complete(Ok(true));
        assert!(pending.wait().unwrap());
    }

    #[test]
    fn completing_into_dropped_ticket_is_silent() {
        let (slot, pending) = pending_pair::<i64>();
        drop(pending);
        slot.complete(Ok(1));
    }
}
