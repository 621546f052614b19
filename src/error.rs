//! Unified error types for the relayhub firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level control loop's error handling uniform. Per the degradation
//! policy, only a missing or corrupt configuration is fatal to boot —
//! everything else downgrades to offline mode or a dropped event.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is missing, unreadable, or invalid. Fatal to boot.
    Config(&'static str),
    /// Local mirror read/write failed. Memory stays authoritative.
    Store(StoreError),
    /// Remote store publish or stream failure. Local truth is unaffected.
    Cloud(CloudError),
    /// Inbound remote payload could not be classified or decoded.
    Parse(ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Cloud(e) => write!(f, "cloud: {e}"),
            Self::Parse(e) => write!(f, "parse: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Local store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The data file could not be opened or created.
    OpenFailed,
    /// Filesystem write or rename failed (flash full, I/O error).
    WriteFailed,
    /// The persisted document could not be re-encoded.
    EncodeFailed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenFailed => write!(f, "data file open failed"),
            Self::WriteFailed => write!(f, "data file write failed"),
            Self::EncodeFailed => write!(f, "data file encode failed"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Remote store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudError {
    /// The stream subscription could not be opened.
    StreamFailed,
    /// A merge write to the remote path failed.
    WriteFailed,
    /// The pending-write queue is at capacity; the write was dropped.
    QueueFull,
    /// A pending write exhausted its retry budget and was dropped.
    RetriesExhausted,
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamFailed => write!(f, "stream subscription failed"),
            Self::WriteFailed => write!(f, "remote write failed"),
            Self::QueueFull => write!(f, "publish queue full, write dropped"),
            Self::RetriesExhausted => write!(f, "retries exhausted, write dropped"),
        }
    }
}

impl From<CloudError> for Error {
    fn from(e: CloudError) -> Self {
        Self::Cloud(e)
    }
}

// ---------------------------------------------------------------------------
// Inbound payload errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not JSON at all.
    NotJson,
    /// The payload is JSON but not an object.
    NotAnObject,
    /// The payload is an object but matches neither the delta nor the
    /// snapshot shape.
    SchemaMismatch,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotJson => write!(f, "payload is not JSON"),
            Self::NotAnObject => write!(f, "payload is not a JSON object"),
            Self::SchemaMismatch => write!(f, "payload matches neither delta nor snapshot"),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
