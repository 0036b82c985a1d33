//! Busy gate between the main menu and event-triggered sub-dialogs.
//!
//! Only one sub-dialog may own the operator's attention at a time. While the
//! gate is held, the menu loop stays quiet and newly arriving dialogs are
//! queued instead of rendered.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared busy flag.
///
/// Cloning shares the flag. Acquisition is RAII: the flag is cleared when the
/// returned [`GateGuard`] is dropped, on every exit path of the holder
/// including `?` propagation and unwinding.
///
/// # Invariants
///
/// - At most one [`GateGuard`] exists per flag at any time.
/// - The flag is set exactly while a guard exists.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    busy: Arc<AtomicBool>,
}

impl Gate {
    /// Create an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a sub-dialog currently owns the operator.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark the gate busy.
    ///
    /// Returns `None` if it is already held.
    #[must_use = "dropping the guard immediately releases the gate"]
    pub fn acquire(&self) -> Option<GateGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { busy: Arc::clone(&self.busy) })
    }
}

/// Proof of gate ownership. Releases the gate on drop.
#[derive(Debug)]
pub struct GateGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_is_exclusive() {
        let gate = Gate::new();
        let guard = gate.acquire();
        assert!(guard.is_some());
        assert!(gate.is_busy());
        assert!(gate.acquire().is_none());

        drop(guard);
        assert!(!gate.is_busy());
        assert!(gate.acquire().is_some());
    }

    #[test]
    fn clones_share_the_flag() {
        let gate = Gate::new();
        let other = gate.clone();
        let _guard = gate.acquire();
        assert!(other.is_busy());
    }

    #[test]
    fn released_on_error_path() {
        fn failing(gate: &Gate) -> Result<(), &'static str> {
            let _guard = gate.acquire().ok_or("busy")?;
            Err("handler failed")?;
            Ok(())
        }

        let gate = Gate::new();
        assert_eq!(failing(&gate), Err("handler failed"));
        assert!(!gate.is_busy());
    }

    #[test]
    fn released_on_unwind() {
        let gate = Gate::new();
        let inner = gate.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = inner.acquire();
            panic!("dialog panicked");
        });

        assert!(result.is_err());
        assert!(!gate.is_busy());
    }
}
