use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Result, SessionError};
use crate::session::Completion;

type Waiter = oneshot::Sender<Result<Value>>;

/// Outbound calls awaiting their reply, keyed by correlation id.
///
/// Once the session has ended, the map refuses new registrations and every
/// waiter is failed with the terminal error.
#[derive(Default)]
pub(crate) struct PendingCalls {
    state: Mutex<PendingState>,
}

#[derive(Default)]
struct PendingState {
    waiters: HashMap<i64, Waiter>,
    terminal: Option<Completion>,
}

impl PendingCalls {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a waiter for `id`. Fails if the session already ended.
    pub(crate) fn register(&self, id: i64) -> Result<oneshot::Receiver<Result<Value>>> {
        let mut state = self.lock();
        if let Some(terminal) = &state.terminal {
            return Err(terminal.to_error());
        }
        let (tx, rx) = oneshot::channel();
        state.waiters.insert(id, tx);
        Ok(rx)
    }

    /// Hand a reply to the waiter for `id`.
    ///
    /// Returns false if nobody is waiting on that id (stale or duplicate).
    pub(crate) fn complete(&self, id: i64, result: Result<Value>) -> bool {
        let waiter = self.lock().waiters.remove(&id);
        match waiter {
            // The caller may have given up between removal and send.
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&self, id: i64) {
        self.lock().waiters.remove(&id);
    }

    /// Mark the map terminal and fail every waiter. Only the first call wins.
    pub(crate) fn close(&self, completion: &Completion) -> usize {
        let waiters: Vec<Waiter> = {
            let mut state = self.lock();
            if state.terminal.is_none() {
                state.terminal = Some(completion.clone());
            }
            state.waiters.drain().map(|(_, tx)| tx).collect()
        };
        let failed = waiters.len();
        for tx in waiters {
            let _ = tx.send(Err(completion.to_error()));
        }
        failed
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().waiters.len()
    }

    pub(crate) fn terminal_error(&self) -> Option<SessionError> {
        self.lock().terminal.as_ref().map(Completion::to_error)
    }
}

/// Removes a pending entry when the call future that owns it is dropped.
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingCalls,
    id: i64,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(pending: &'a PendingCalls, id: i64) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.id);
    }
}
