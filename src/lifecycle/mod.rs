//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Build sinks → Resolve TLS → Register listeners per protocol
//!     → assert ≥ 1 active listener → Running
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT before Running → exit(1), no cleanup
//!     SIGTERM/SIGINT once Running   → set shutdown-requested (state.rs)
//!
//! Shutdown (controller.rs, session.rs):
//!     flag observed → listener shutdown handlers (registration order)
//!     → stop output → sink cleanup handlers (registration order) → exit(0)
//! ```
//!
//! # Design Decisions
//! - Cleanup always runs on the controller's task, never the signal task
//! - The state lock is held only for single-field reads/writes
//! - A failed startup stops already-started listeners before exiting

pub mod controller;
pub mod session;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use controller::{Controller, SessionError};
pub use session::{Session, ShutdownReport};
pub use shutdown::Shutdown;
pub use state::{LifecycleState, Phase, TerminationPath};
