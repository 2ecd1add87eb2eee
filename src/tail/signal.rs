use std::sync::Mutex;

/// Pending-update state shared between the poller and the reporting side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateState {
    /// The consumer has seen everything.
    #[default]
    Clean,
    /// New data has been ingested and not yet acknowledged.
    Pending,
    /// More data arrived while an update was already pending.
    PendingMore,
}

/// Coalescing single-slot update notification.
///
/// At most one generation beyond the one being acknowledged is remembered,
/// so the consumer re-reads the model once more instead of once per poll.
#[derive(Debug, Default)]
pub struct UpdateSignal {
    state: Mutex<UpdateState>,
}

impl UpdateSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a poll ingested new lines.
    pub fn notify(&self) {
        self.update(|s| match s {
            UpdateState::Clean => UpdateState::Pending,
            UpdateState::Pending | UpdateState::PendingMore => UpdateState::PendingMore,
        });
    }

    /// Consumer acknowledgement after re-reading the model.
    pub fn acknowledge(&self) {
        self.update(|s| match s {
            UpdateState::PendingMore => UpdateState::Pending,
            UpdateState::Pending | UpdateState::Clean => UpdateState::Clean,
        });
    }

    pub fn is_updated(&self) -> bool {
        self.state() != UpdateState::Clean
    }

    pub fn state(&self) -> UpdateState {
        // The state is a plain value; a poisoned lock still holds a valid one.
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(UpdateState) -> UpdateState) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = f(*guard);
    }
}
