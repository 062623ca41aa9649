//! Cancel-on-supersede debouncing for rapid free-text input.

use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "async")]
use std::sync::Arc;

/// Generation counter. A ticket stays current only until a newer one is
/// issued, so a stale pending action can tell it should not run.
#[derive(Debug, Default)]
pub struct DebounceGate {
    generation: AtomicU64,
}

impl DebounceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket, superseding every earlier one.
    pub fn ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

/// Runs a closure after a quiet period. A newer call aborts the pending one,
/// so only the latest call in a burst runs.
#[cfg(feature = "async")]
pub struct Debouncer {
    delay: std::time::Duration,
    gate: Arc<DebounceGate>,
    pending: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[cfg(feature = "async")]
impl Debouncer {
    pub fn new(delay: std::time::Duration) -> Self {
        Self {
            delay,
            gate: Arc::new(DebounceGate::new()),
            pending: std::sync::Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(std::time::Duration::from_millis(ms))
    }

    /// Schedule `action`. Must be called inside a tokio runtime.
    pub fn call<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let ticket = self.gate.ticket();
        let gate = Arc::clone(&self.gate);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Abort can race with the timer firing; the ticket settles it.
            if gate.is_current(ticket) {
                action();
            }
        });
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop whatever is pending without running it.
    pub fn cancel(&self) {
        self.gate.ticket();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn newer_ticket_supersedes() {
        let gate = DebounceGate::new();
        let a = gate.ticket();
        assert!(gate.is_current(a));
        let b = gate.ticket();
        assert!(!gate.is_current(a));
        assert!(gate.is_current(b));
    }

    #[test]
    fn shared_across_threads() {
        let gate = Arc::new(DebounceGate::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.ticket())
            })
            .collect();
        let mut tickets: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        tickets.sort_unstable();
        tickets.dedup();
        assert_eq!(tickets.len(), 8);
        assert!(gate.is_current(8));
    }

    #[cfg(feature = "async")]
    mod timed {
        use super::super::*;
        use std::sync::Mutex;
        use std::time::Duration;

        #[tokio::test(start_paused = true)]
        async fn only_latest_call_runs() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let debouncer = Debouncer::from_millis(300);
            for query in ["s", "sa", "sao"] {
                let seen = Arc::clone(&seen);
                debouncer.call(move || seen.lock().unwrap().push(query));
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_millis(400)).await;
            assert_eq!(*seen.lock().unwrap(), ["sao"]);
        }

        #[tokio::test(start_paused = true)]
        async fn spaced_calls_all_run() {
            let seen = Arc::new(Mutex::new(Vec::new()));
            let debouncer = Debouncer::from_millis(50);
            for query in ["a", "b"] {
                let seen = Arc::clone(&seen);
                debouncer.call(move || seen.lock().unwrap().push(query));
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            assert_eq!(*seen.lock().unwrap(), ["a", "b"]);
        }

        #[tokio::test(start_paused = true)]
        async fn cancel_drops_pending() {
            let seen = Arc::new(Mutex::new(0));
            let debouncer = Debouncer::from_millis(50);
            let counter = Arc::clone(&seen);
            debouncer.call(move || *counter.lock().unwrap() += 1);
            debouncer.cancel();
            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(*seen.lock().unwrap(), 0);
        }
    }
}
