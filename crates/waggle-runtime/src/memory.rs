//! [`DecisionMemory`] – bounded recall of recent decision reasons.
//!
//! The memory keeps a rolling window of the last *N* non-empty reasons and
//! notices when the agent keeps giving the same one.  The prompt builder
//! shows the window to the model and, once the trailing run of identical
//! reasons reaches the threshold, asks it to try something different.
//!
//! # Example
//!
//! ```rust
//! use waggle_runtime::memory::DecisionMemory;
//!
//! let mut memory = DecisionMemory::new(5, 3);
//! memory.push("walk to the door");
//! memory.push("walk to the door");
//! assert!(!memory.is_repeating());
//! memory.push("walk to the door");
//! assert!(memory.is_repeating());
//! ```

use std::collections::VecDeque;

// ─────────────────────────────────────────────────────────────────────────────
// DecisionMemory
// ─────────────────────────────────────────────────────────────────────────────

/// Ring buffer of recent decision reasons, oldest first.
#[derive(Debug, Clone)]
pub struct DecisionMemory {
    capacity: usize,
    /// Trailing streak length that counts as repetition.
    threshold: usize,
    reasons: VecDeque<String>,
}

impl DecisionMemory {
    /// `capacity` is clamped to at least 1 and `threshold` to at least 2.
    pub fn new(capacity: usize, threshold: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            threshold: threshold.max(2),
            reasons: VecDeque::with_capacity(capacity),
        }
    }

    /// Remember `reason`, evicting the oldest entry when full.  Blank
    /// reasons are ignored.
    pub fn push(&mut self, reason: &str) {
        let reason = reason.trim();
        if reason.is_empty() {
            return;
        }
        self.reasons.push_back(reason.to_string());
        while self.reasons.len() > self.capacity {
            self.reasons.pop_front();
        }
    }

    /// Stored reasons, oldest first.
    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.reasons.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn clear(&mut self) {
        self.reasons.clear();
    }

    /// Number of identical reasons at the end of the window.
    pub fn repeated_streak(&self) -> usize {
        let Some(last) = self.reasons.back() else {
            return 0;
        };
        self.reasons.iter().rev().take_while(|r| *r == last).count()
    }

    pub fn is_repeating(&self) -> bool {
        self.repeated_streak() >= self.threshold
    }
}
