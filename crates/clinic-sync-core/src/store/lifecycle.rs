//! Request lifecycle shared by entity store operations.

use tokio::sync::{watch, Mutex, MutexGuard};

use super::EntityState;

/// One running operation.
///
/// Acquiring it waits for the store's previous operation to finish, then
/// sets `loading` and clears `error`. Dropping it clears `loading`, whether
/// the operation completed or its future was abandoned.
pub(crate) struct InFlight<'a> {
    state: &'a watch::Sender<EntityState>,
    _slot: MutexGuard<'a, ()>,
}

impl<'a> InFlight<'a> {
    pub(crate) async fn begin(gate: &'a Mutex<()>, state: &'a watch::Sender<EntityState>) -> Self {
        let slot = gate.lock().await;
        state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        Self { state, _slot: slot }
    }

    /// Apply the operation's result to the state.
    pub(crate) fn succeed(self, apply: impl FnOnce(&mut EntityState)) {
        self.state.send_modify(apply);
    }

    /// Record the operation's failure message.
    pub(crate) fn fail(self, message: &str) {
        self.state.send_modify(|s| s.error = Some(message.to_string()));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
    }
}
