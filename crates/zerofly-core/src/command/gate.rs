// Shared marker between the command queue and the poll path.
//
// Every command bumps the generation when it starts and again when it
// finishes. A poll remembers the generation it started under; if it changed
// (or a command is still running) by the time the result reaches the store
// writer, the result is stale and gets dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct CommandGate {
    generation: AtomicU64,
    active: AtomicUsize,
}

impl CommandGate {
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Commands currently past their permit and talking to the daemon/host.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn enter(self: &Arc<Self>) -> GateGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        GateGuard {
            gate: Arc::clone(self),
        }
    }
}

/// Held for the duration of one command's critical section.
pub(crate) struct GateGuard {
    gate: Arc<CommandGate>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.generation.fetch_add(1, Ordering::SeqCst);
        self.gate.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_and_leave_both_bump_generation() {
        let gate = Arc::new(CommandGate::default());
        let start = gate.generation();

        let guard = gate.enter();
        assert_eq!(gate.active(), 1);
        assert_eq!(gate.generation(), start + 1);

        drop(guard);
        assert_eq!(gate.active(), 0);
        assert_eq!(gate.generation(), start + 2);
    }
}
