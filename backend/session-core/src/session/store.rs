use crate::session::state::SessionState;

use tokio::sync::watch;

/// Holder of the current snapshot.
///
/// Updates are read-modify-write closures run under the channel lock, so two
/// writers never interleave and subscribers only see whole states.
pub(crate) struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx }
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub(crate) fn replace_with<F>(&self, update: F)
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        self.tx.send_modify(|current| {
            let next = update(current);
            *current = next;
        });
    }
}
