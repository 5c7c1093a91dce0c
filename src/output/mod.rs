//! Output subsystem.
//!
//! # Data Flow
//! ```text
//! destination strings ["-", "/var/log/creds.json", "https://hooks..."]
//!     → set.rs (classify, open, console guaranteed exactly once)
//!     → SinkSet shared via Arc with every listener
//!
//! Protocol engine observes a credential attempt
//!     → record.rs (CapturedRecord, timestamped)
//!     → SinkSet::deliver (fan-out, each sink independent)
//!         → console: structured log event
//!         → file:    one JSON object per line
//!         → webhook: webhook.rs POST {"text": <json>}
//!
//! Teardown:
//!     SinkSet::done (stop accepting) → SinkSet::cleanup (close files)
//! ```
//!
//! # Design Decisions
//! - Setup failures (unopenable file, bad URL) are fatal
//! - Delivery failures are returned to the caller, never retried here

pub mod record;
pub mod set;
pub mod sink;
pub mod webhook;

pub use record::{CapturedRecord, TIMESTAMP_KEY};
pub use set::{FanOutError, SinkFailure, SinkSet, CONSOLE_MARKER};
pub use sink::{ConsoleSink, DeliveryError, FileSink, OutputSink, SinkError, SinkKind, WebhookSink};
pub use webhook::{WebhookClient, WebhookError, USER_AGENT, WEBHOOK_TIMEOUT};
