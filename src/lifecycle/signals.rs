//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT/SIGTERM (Ctrl+C elsewhere)
//! - Translate the signal into a lifecycle termination request
//! - Exit immediately when startup has not completed
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The signal task never runs cleanup; it only flips lifecycle state

use std::future::Future;

use tokio::task::JoinHandle;

use crate::lifecycle::state::{LifecycleState, TerminationPath};

/// Exit code for termination before startup completed.
pub const EARLY_EXIT_CODE: i32 = 1;

/// Resolve when the process is asked to terminate.
pub async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Spawn the signal-watching task.
///
/// Waits for `signal`, then files a termination request with `state`. On the
/// early path `on_early` runs while the lifecycle lock is held (the binary
/// passes a process exit).
pub fn spawn_watcher<S, E>(state: LifecycleState, signal: S, on_early: E) -> JoinHandle<TerminationPath>
where
    S: Future<Output = ()> + Send + 'static,
    E: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        signal.await;
        let path = state.request_termination_with(|| {
            tracing::warn!("terminating early...");
            on_early();
        });
        if path == TerminationPath::Graceful {
            tracing::info!("Shutdown signal received");
        }
        path
    })
}
