//! Output sink implementations: console, file, webhook.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;

use crate::output::record::{CapturedRecord, TIMESTAMP_KEY};
use crate::output::webhook::{WebhookClient, WebhookError};

/// Errors raised while configuring a sink. These are fatal at startup.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open output file {path:?}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid webhook url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build webhook client: {0}")]
    Client(#[from] WebhookError),
}

/// Errors raised while delivering a single record to a single sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("sink is closed")]
    Closed,
}

/// Sink variant, used for logging and invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
    Webhook,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Webhook => "webhook",
        }
    }
}

/// A delivery target for captured records.
pub trait OutputSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Human readable target, e.g. the file path or webhook URL.
    fn target(&self) -> &str;

    /// Write one record to the sink's medium.
    fn deliver<'a>(&'a self, record: &'a CapturedRecord) -> BoxFuture<'a, Result<(), DeliveryError>>;

    /// Release the sink's resources. Called once during teardown.
    fn cleanup(&self) {}

    /// Whether `cleanup` does anything.
    fn has_cleanup(&self) -> bool {
        false
    }
}

/// Renders records as structured log events.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    /// Compact JSON object of the record's fields in key order, timestamp
    /// dropped (the log line carries its own).
    pub fn render(record: &CapturedRecord) -> Result<String, serde_json::Error> {
        let fields: BTreeMap<&str, &str> = record
            .fields()
            .filter(|(key, _)| *key != TIMESTAMP_KEY)
            .collect();
        serde_json::to_string(&fields)
    }
}

impl OutputSink for ConsoleSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn target(&self) -> &str {
        "-"
    }

    fn deliver<'a>(&'a self, record: &'a CapturedRecord) -> BoxFuture<'a, Result<(), DeliveryError>> {
        async move {
            let rendered = Self::render(record)?;
            tracing::info!(target: "credential", record = %rendered, "credential");
            Ok(())
        }
        .boxed()
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct FileSink {
    path: String,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: &str) -> Result<Self, SinkError> {
        let file = File::create(Path::new(path)).map_err(|source| SinkError::OpenFile {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(Self {
            path: path.to_string(),
            file: Mutex::new(Some(file)),
        })
    }
}

impl OutputSink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn target(&self) -> &str {
        &self.path
    }

    fn deliver<'a>(&'a self, record: &'a CapturedRecord) -> BoxFuture<'a, Result<(), DeliveryError>> {
        async move {
            let mut line = record.to_json()?;
            line.push('\n');

            let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
            let file = guard.as_mut().ok_or(DeliveryError::Closed)?;
            file.write_all(line.as_bytes())?;
            Ok(())
        }
        .boxed()
    }

    fn cleanup(&self) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(mut file) = guard.take() {
            if let Err(e) = file.flush() {
                tracing::warn!(path = %self.path, error = %e, "Failed to flush output file");
            }
            tracing::debug!(path = %self.path, "Output file closed");
        }
    }

    fn has_cleanup(&self) -> bool {
        true
    }
}

/// Posts each record to a webhook URL.
#[derive(Debug)]
pub struct WebhookSink {
    url: String,
    client: WebhookClient,
}

impl WebhookSink {
    pub fn new(url: &str) -> Result<Self, SinkError> {
        url::Url::parse(url).map_err(|source| SinkError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            url: url.to_string(),
            client: WebhookClient::new()?,
        })
    }

    /// Use a preconfigured client (custom timeout).
    pub fn with_client(url: &str, client: WebhookClient) -> Self {
        Self {
            url: url.to_string(),
            client,
        }
    }
}

impl OutputSink for WebhookSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Webhook
    }

    fn target(&self) -> &str {
        &self.url
    }

    fn deliver<'a>(&'a self, record: &'a CapturedRecord) -> BoxFuture<'a, Result<(), DeliveryError>> {
        async move {
            let payload = record.to_json()?;
            self.client.post(&self.url, &payload).await?;
            Ok(())
        }
        .boxed()
    }
}
