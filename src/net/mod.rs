//! Network bootstrap helpers.
//!
//! # Data Flow
//! ```text
//! port spec string ("22,2222,8000-8010")
//!     → ports.rs (concrete, ascending port list)
//!     → one listener per port
//!
//! TLS cert/key paths
//!     → tls.rs (load from disk, or synthesize self-signed)
//!     → TlsMaterial shared by every TLS-dependent listener
//!
//! SSH host key path
//!     → host_key.rs (load from disk, or synthesize)
//! ```
//!
//! # Design Decisions
//! - Unreadable files are configuration errors, never retried
//! - Synthesized material is fresh per session, never cached on disk

pub mod host_key;
pub mod ports;
pub mod tls;

pub use host_key::{resolve_host_key, HostKey, HostKeyError};
pub use ports::{parse_ports, PortSpecError};
pub use tls::{TlsError, TlsMaterial};
