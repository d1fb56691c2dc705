use std::sync::{Condvar, Mutex};

/// Cooperative suspend/resume barrier for the data path.
///
/// The gate is level-triggered: waiters re-check the current state after
/// every wakeup, so a pause followed by a resume before any waiter runs
/// leaves the gate open and nobody blocks.
pub struct PauseGate {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl PauseGate {
    /// Creates an open (resumed) gate.
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(false),
            resumed: Condvar::new(),
        }
    }

    /// Flips between paused and resumed. Returns the new paused state.
    ///
    /// Safe to call from any thread while I/O is in flight; a resume wakes
    /// every blocked waiter.
    pub fn toggle(&self) -> bool {
        let mut paused = self.paused.lock().unwrap();
        *paused = !*paused;
        if *paused {
            tracing::info!("paused, press Enter to resume");
        } else {
            tracing::info!("resumed, press Enter to pause");
            self.resumed.notify_all();
        }
        *paused
    }

    /// Blocks the caller until the gate is resumed. Returns immediately when
    /// the gate is already open.
    pub fn wait_if_paused(&self) {
        let mut paused = self.paused.lock().unwrap();
        while *paused {
            paused = self.resumed.wait(paused).unwrap();
        }
    }

    /// Non-blocking snapshot of the paused flag.
    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_resumed() {
        let gate = PauseGate::new();
        assert!(!gate.is_paused());
        // Must not block.
        gate.wait_if_paused();
    }

    #[test]
    fn toggle_flips_state() {
        let gate = PauseGate::new();
        assert!(gate.toggle());
        assert!(gate.is_paused());
        assert!(!gate.toggle());
        assert!(!gate.is_paused());
    }

    #[test]
    fn pause_then_resume_before_wait_does_not_block() {
        let gate = PauseGate::new();
        gate.toggle();
        gate.toggle();
        gate.wait_if_paused();
        assert!(!gate.is_paused());
    }

    #[test]
    fn waiter_blocks_until_resumed() {
        let gate = Arc::new(PauseGate::new());
        gate.toggle();

        let passed = Arc::new(AtomicBool::new(false));
        let waiter = {
            let gate = Arc::clone(&gate);
            let passed = Arc::clone(&passed);
            thread::spawn(move || {
                gate.wait_if_paused();
                passed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!passed.load(Ordering::SeqCst));

        gate.toggle();
        waiter.join().unwrap();
        assert!(passed.load(Ordering::SeqCst));
    }

    #[test]
    fn rapid_double_toggle_never_deadlocks_waiter() {
        let gate = Arc::new(PauseGate::new());
        gate.toggle();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait_if_paused())
        };

        // Resume, pause and resume again faster than the waiter can observe.
        gate.toggle();
        gate.toggle();
        gate.toggle();

        waiter.join().unwrap();
        assert!(!gate.is_paused());
    }

    #[test]
    fn many_waiters_all_released() {
        let gate = Arc::new(PauseGate::new());
        gate.toggle();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.wait_if_paused())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        gate.toggle();

        for h in handles {
            h.join().unwrap();
        }
    }
}
