use std::{path::PathBuf, process::ExitStatus, time::Duration};

use thiserror::Error;

use crate::types::BlockPair;

pub const MISSING_TOOL_HINT: &str =
    "either install it or provide a file with pairwise similarities (--similarities)";

#[derive(Debug, Error)]
pub enum AniError {
    #[error("{program} was not found on PATH, {hint}")]
    ToolNotFound { program: String, hint: &'static str },

    #[error("similarity method '{0}' is not implemented, only fastANI is supported")]
    UnsupportedMethod(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("block pair {pair}: tool exited with {status}: {stderr}")]
    ToolFailed {
        pair: BlockPair,
        status: ExitStatus,
        stderr: String,
    },

    #[error("block pair {pair}: tool did not finish within {timeout:?}")]
    ToolTimeout { pair: BlockPair, timeout: Duration },

    #[error("block pair {pair}: could not run tool: {source}")]
    ToolIo {
        pair: BlockPair,
        #[source]
        source: std::io::Error,
    },

    #[error("block pair {pair}: tool left no output at {path:?}")]
    MissingOutput { pair: BlockPair, path: PathBuf },

    #[error("block pair {pair}: malformed output on line {line}: {reason}")]
    MalformedRow {
        pair: BlockPair,
        line: u64,
        reason: String,
    },

    #[error("{path:?}: malformed line {line}: {reason}")]
    MalformedFile {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("identifier '{id}' is shared by {first:?} and {second:?}")]
    DuplicateIdentifier {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no bins found in {0}")]
    NoBins(String),

    #[error("{path:?} is not a usable fasta: {reason}")]
    InvalidSequenceFile { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AniError {
    /// The block pair an invocation-level failure belongs to.
    ///
    /// Only these failures are subject to retries and the skip policy.
    pub fn block_pair(&self) -> Option<BlockPair> {
        match self {
            AniError::ToolFailed { pair, .. }
            | AniError::ToolTimeout { pair, .. }
            | AniError::ToolIo { pair, .. }
            | AniError::MissingOutput { pair, .. }
            | AniError::MalformedRow { pair, .. } => Some(*pair),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AniError>;
