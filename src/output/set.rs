//! The session's fan-out sink set.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use thiserror::Error;

use crate::observability::metrics;
use crate::output::record::CapturedRecord;
use crate::output::sink::{
    ConsoleSink, DeliveryError, FileSink, OutputSink, SinkError, SinkKind, WebhookSink,
};

/// Destination string selecting the console sink.
pub const CONSOLE_MARKER: &str = "-";

/// One sink's failure during a fan-out delivery.
#[derive(Debug)]
pub struct SinkFailure {
    pub kind: SinkKind,
    pub target: String,
    pub error: DeliveryError,
}

/// Errors returned by [`SinkSet::deliver`].
#[derive(Debug, Error)]
pub enum FanOutError {
    /// Output processing has stopped for the session.
    #[error("output is closed")]
    Closed,

    /// At least one sink failed; the others were still attempted.
    #[error("{} sink(s) failed: {}", .0.len(), describe_failures(.0))]
    Failed(Vec<SinkFailure>),
}

impl FanOutError {
    pub fn failures(&self) -> &[SinkFailure] {
        match self {
            FanOutError::Closed => &[],
            FanOutError::Failed(failures) => failures,
        }
    }
}

fn describe_failures(failures: &[SinkFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} {}: {}", f.kind.as_str(), f.target, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered set of output sinks. The console sink is always present exactly once.
pub struct SinkSet {
    sinks: Vec<Box<dyn OutputSink>>,
    closed: AtomicBool,
    cleaned: AtomicBool,
}

impl SinkSet {
    /// Build the sink set from destination strings.
    ///
    /// `-` selects the console, `http://`/`https://` a webhook, and anything
    /// else is a file path opened in truncate mode.
    pub fn build<S: AsRef<str>>(destinations: &[S]) -> Result<Self, SinkError> {
        let mut sinks: Vec<Box<dyn OutputSink>> = Vec::new();
        let mut console = false;

        for destination in destinations {
            let destination = destination.as_ref();
            if destination == CONSOLE_MARKER {
                if !console {
                    sinks.push(Box::new(ConsoleSink));
                    console = true;
                }
                continue;
            }

            if destination.starts_with("http://") || destination.starts_with("https://") {
                sinks.push(Box::new(WebhookSink::new(destination)?));
                continue;
            }

            sinks.push(Box::new(FileSink::create(destination)?));
        }

        // Always log to the console
        if !console {
            sinks.push(Box::new(ConsoleSink));
        }

        for sink in &sinks {
            tracing::debug!(kind = sink.kind().as_str(), target = %sink.target(), "Output configured");
        }

        Ok(Self::from_sinks(sinks))
    }

    /// Wrap an explicit list of sinks, in order.
    pub fn from_sinks(sinks: Vec<Box<dyn OutputSink>>) -> Self {
        Self {
            sinks,
            closed: AtomicBool::new(false),
            cleaned: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Sink kinds in registration order.
    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|s| s.kind()).collect()
    }

    /// Sink targets in registration order.
    pub fn targets(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.target()).collect()
    }

    /// Deliver `record` to every sink independently.
    ///
    /// A failing sink never prevents delivery to the others.
    pub async fn deliver(&self, record: &CapturedRecord) -> Result<(), FanOutError> {
        if self.is_closed() {
            return Err(FanOutError::Closed);
        }

        let results = join_all(self.sinks.iter().map(|sink| sink.deliver(record))).await;

        let mut failures = Vec::new();
        for (sink, result) in self.sinks.iter().zip(results) {
            let kind = sink.kind();
            match result {
                Ok(()) => metrics::record_delivery(kind.as_str(), true),
                Err(error) => {
                    metrics::record_delivery(kind.as_str(), false);
                    tracing::warn!(
                        kind = kind.as_str(),
                        target = %sink.target(),
                        error = %error,
                        "Record delivery failed"
                    );
                    failures.push(SinkFailure {
                        kind,
                        target: sink.target().to_string(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FanOutError::Failed(failures))
        }
    }

    /// Stop accepting records.
    pub fn done(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Run every sink's cleanup in registration order. Only the first call has
    /// any effect; returns the number of cleanup handlers invoked.
    pub fn cleanup(&self) -> usize {
        if self.cleaned.swap(true, Ordering::SeqCst) {
            return 0;
        }
        self.done();

        let mut invoked = 0;
        for sink in self.sinks.iter().filter(|s| s.has_cleanup()) {
            sink.cleanup();
            invoked += 1;
        }
        invoked
    }
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSet")
            .field("sinks", &self.targets())
            .field("closed", &self.is_closed())
            .finish()
    }
}
