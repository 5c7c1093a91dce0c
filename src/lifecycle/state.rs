//! Session lifecycle state shared between the controller and the signal task.
//!
//! # States
//! ```text
//! Idle → Configuring → Running → ShuttingDown → Terminated
//! ```
//!
//! A termination request before `Running` takes the early path (exit now,
//! no cleanup). From `Running` on it only sets the shutdown-requested flag;
//! the controller observes it and runs cleanup on its own task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

/// Upper bound on how long the controller sleeps between flag checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Configuring,
    Running,
    ShuttingDown,
    Terminated,
}

/// How a termination request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationPath {
    /// Startup has not completed: exit immediately without cleanup.
    Early,
    /// Startup completed: the controller performs cleanup.
    Graceful,
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    shutdown_requested: bool,
}

/// Mutex-guarded lifecycle flags. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct LifecycleState {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Idle,
                shutdown_requested: false,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn shutdown_requested(&self) -> bool {
        self.lock().shutdown_requested
    }

    pub fn begin_configuring(&self) {
        self.lock().phase = Phase::Configuring;
    }

    /// Mark startup complete. From here on termination is graceful.
    pub fn mark_running(&self) {
        self.lock().phase = Phase::Running;
    }

    pub fn mark_terminated(&self) {
        self.lock().phase = Phase::Terminated;
    }

    /// Handle a termination request from the signal task.
    ///
    /// Never runs cleanup itself.
    pub fn request_termination(&self) -> TerminationPath {
        self.request_termination_with(|| {})
    }

    /// Like [`request_termination`](Self::request_termination), running
    /// `on_early` on the early path before the state lock is released, so
    /// startup cannot complete between the decision and the hook.
    ///
    /// `on_early` must not touch this state.
    pub fn request_termination_with<F: FnOnce()>(&self, on_early: F) -> TerminationPath {
        let mut inner = self.lock();
        let phase = inner.phase;
        match phase {
            Phase::Idle | Phase::Configuring => {
                on_early();
                TerminationPath::Early
            }
            Phase::Running | Phase::ShuttingDown | Phase::Terminated => {
                inner.shutdown_requested = true;
                drop(inner);
                self.notify.notify_one();
                TerminationPath::Graceful
            }
        }
    }

    /// Block until shutdown is requested, then enter `ShuttingDown`.
    ///
    /// Wakes on notification, and re-checks the flag at least every
    /// [`POLL_INTERVAL`].
    pub async fn wait_for_shutdown(&self) {
        loop {
            {
                let mut inner = self.lock();
                if inner.shutdown_requested {
                    inner.phase = Phase::ShuttingDown;
                    return;
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_before_running_is_early() {
        let state = LifecycleState::new();
        assert_eq!(state.request_termination(), TerminationPath::Early);

        state.begin_configuring();
        assert_eq!(state.request_termination(), TerminationPath::Early);
        assert!(!state.shutdown_requested());
    }

    #[test]
    fn early_hook_runs_under_the_state_lock() {
        let state = LifecycleState::new();
        state.begin_configuring();

        let mut lock_held = false;
        let path = state.request_termination_with(|| {
            lock_held = state.inner.try_lock().is_err();
        });

        assert_eq!(path, TerminationPath::Early);
        assert!(lock_held);
        assert_eq!(state.phase(), Phase::Configuring);
        assert!(!state.shutdown_requested());
    }

    #[test]
    fn graceful_path_skips_early_hook() {
        let state = LifecycleState::new();
        state.mark_running();

        let mut called = false;
        let path = state.request_termination_with(|| called = true);

        assert_eq!(path, TerminationPath::Graceful);
        assert!(!called);
        assert!(state.shutdown_requested());
    }

    #[test]
    fn termination_after_running_is_deferred() {
        let state = LifecycleState::new();
        state.begin_configuring();
        state.mark_running();

        assert_eq!(state.request_termination(), TerminationPath::Graceful);
        assert!(state.shutdown_requested());
        assert_eq!(state.phase(), Phase::Running);
    }

    #[tokio::test]
    async fn wait_resolves_on_request() {
        let state = LifecycleState::new();
        state.mark_running();

        let waiter = state.clone();
        let task = tokio::spawn(async move { waiter.wait_for_shutdown().await });
        tokio::task::yield_now().await;
        state.request_termination();

        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .expect("notification should wake the controller before the poll interval")
            .unwrap();
        assert_eq!(state.phase(), Phase::ShuttingDown);
    }

    #[tokio::test]
    async fn poll_observes_flag_without_notification() {
        let state = LifecycleState::new();
        state.mark_running();
        state.lock().shutdown_requested = true;

        state.wait_for_shutdown().await;
        assert_eq!(state.phase(), Phase::ShuttingDown);
    }
}
