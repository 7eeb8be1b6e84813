//! Error types for ipset-exec.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = IpsetError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum IpsetError {
    #[error("ipset binary not found: {0}")]
    BinaryNotFound(String),

    /// Non-zero exit. Displays as the captured stderr text.
    #[error("{}", .stderr.trim_end())]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
        kind: FailureKind,
    },

    #[error("cannot decode ipset xml output: {0}")]
    Decode(#[from] quick_xml::de::DeError),

    #[error("listing set '{name}' returned {count} results, expected exactly one")]
    AmbiguousResult { name: String, count: usize },

    #[error("ipset {command} timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("ipset {command} cancelled")]
    Cancelled { command: String },

    #[error("invalid set options: {0}")]
    InvalidOptions(String),

    #[error("failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create the temp set {name} for swap: {source}")]
    TempSet {
        name: String,
        #[source]
        source: Box<IpsetError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IpsetError {
    /// Classification of a subprocess failure, `None` for every other variant.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Subprocess { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Coarse classification of the messages ipset prints on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SetNotFound,
    SetExists,
    ElementExists,
    ElementMissing,
    NotInSet,
    PermissionDenied,
    Other,
}

impl FailureKind {
    pub fn classify(stderr: &str) -> Self {
        let msg = stderr.to_ascii_lowercase();
        if msg.contains("is not in set") {
            Self::NotInSet
        } else if msg.contains("does not exist") {
            Self::SetNotFound
        } else if msg.contains("set with the same name already exists") {
            Self::SetExists
        } else if msg.contains("it's already added") {
            Self::ElementExists
        } else if msg.contains("it's not added") {
            Self::ElementMissing
        } else if msg.contains("operation not permitted") || msg.contains("permission denied") {
            Self::PermissionDenied
        } else {
            Self::Other
        }
    }
}
