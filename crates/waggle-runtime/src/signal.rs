//! Shared flags between the timelines and their owner.
//!
//! [`PauseSignal`] lets a running Wait gesture freeze navigation.
//! [`CancelToken`] is handed to each timeline run; once cancelled, the run
//! performs no further mutation and is dropped on its next tick or settle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Navigation pause flag, set by the action timeline while a Wait runs.
#[derive(Debug, Clone, Default)]
pub struct PauseSignal(Arc<AtomicBool>);

impl PauseSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cooperative cancellation handle for one timeline run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let pause = PauseSignal::new();
        let seen_by_nav = pause.clone();
        pause.set();
        assert!(seen_by_nav.is_set());
        seen_by_nav.clear();
        assert!(!pause.is_set());

        let token = CancelToken::new();
        let held = token.clone();
        assert!(!held.is_cancelled());
        token.cancel();
        assert!(held.is_cancelled());
    }
}
