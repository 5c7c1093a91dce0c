//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (command-line / environment overrides)
//!     → validation.rs (semantic checks)
//!     → CaptureConfig (validated, immutable)
//!     → owned by the lifecycle controller for one session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a session never re-reads it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    CaptureConfig, ListenerConfig, LogFormat, ObservabilityConfig, SshConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
