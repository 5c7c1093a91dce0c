//! Port specification parsing.
//!
//! Accepts comma-separated ports and inclusive ranges, e.g. `"22,2222,8000-8010"`.

use std::collections::BTreeSet;

use thiserror::Error;

/// Errors produced while parsing a port specification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortSpecError {
    #[error("port specification is empty")]
    Empty,

    #[error("empty entry in port specification '{0}'")]
    EmptyEntry(String),

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("port {0} is out of range (1-65535)")]
    OutOfRange(u32),

    #[error("range {start}-{end} is reversed")]
    ReversedRange { start: u16, end: u16 },
}

/// Parse a port specification into ascending, de-duplicated port numbers.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>, PortSpecError> {
    if spec.trim().is_empty() {
        return Err(PortSpecError::Empty);
    }

    let mut ports = BTreeSet::new();
    for entry in spec.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(PortSpecError::EmptyEntry(spec.to_string()));
        }

        match entry.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                if start > end {
                    return Err(PortSpecError::ReversedRange { start, end });
                }
                ports.extend(start..=end);
            }
            None => {
                ports.insert(parse_port(entry)?);
            }
        }
    }

    Ok(ports.into_iter().collect())
}

fn parse_port(raw: &str) -> Result<u16, PortSpecError> {
    let raw = raw.trim();
    let value: u32 = raw
        .parse()
        .map_err(|_| PortSpecError::InvalidPort(raw.to_string()))?;
    if value == 0 || value > u16::MAX as u32 {
        return Err(PortSpecError::OutOfRange(value));
    }
    Ok(value as u16)
}
