use crate::page::ObserverHandle;
use std::collections::BTreeSet;

/// Per-monitor recovery bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryState {
    /// An observer has been installed on the current document
    pub initialized: bool,

    /// A recovery cycle is running
    pub in_progress: bool,

    /// Clock time the last cycle ended; `None` before the first one
    pub last_action_ms: Option<u64>,

    /// Failed attempts in the current cycle
    pub retry_count: u32,

    pub observers: BTreeSet<ObserverHandle>,
}

impl RecoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time left before another cycle may start, if any
    pub fn cooldown_remaining(&self, now_ms: u64, cooldown_ms: u64) -> Option<u64> {
        let last = self.last_action_ms?;
        let elapsed = now_ms.saturating_sub(last);
        (elapsed < cooldown_ms).then(|| cooldown_ms - elapsed)
    }

    pub fn begin(&mut self) {
        self.in_progress = true;
        self.retry_count = 0;
    }

    pub fn finish(&mut self, now_ms: u64) {
        self.in_progress = false;
        self.last_action_ms = Some(now_ms);
    }
}
