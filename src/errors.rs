//! Application error model and process exit-code mapping
//!
//! Defines a typed error hierarchy using `thiserror`. Each fatal variant maps
//! to the process exit code documented for this tool's CLI.

use thiserror::Error;

/// Application error type
///
/// Covers every fatal condition the extractor can hit. Skippable conditions
/// (missing item payloads, unresolved attachment ids, excluded item kinds)
/// are never represented here -- they are counted into `FileLedger::skip_count`
/// instead and logged at `warn` level.
#[derive(Debug, Error)]
pub enum AppError {
    /// Regex compilation failed (the `<meta charset>` sniffing pattern)
    #[error("failed to compile regex: {0}")]
    RegexCompile(String),

    /// The archive could not be opened
    #[error("error opening archive: {0}")]
    ArchiveOpen(String),

    /// The archive's index could not be loaded
    #[error("error loading archive index: {0}")]
    IndexLoad(String),

    /// Invalid command-line arguments
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    /// A filesystem operation (chdir, mkdir, open, unlink) failed
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// The unique-suffix counter for a colliding output path was exhausted
    #[error("exhausted unique filename suffixes for {0}")]
    SuffixExhausted(String),

    /// Recurrence data on an appointment item was malformed
    #[error("malformed recurrence data: {0}")]
    MalformedRecurrence(String),

    /// A pooled worker task returned a non-zero status
    #[error("worker task failed: {0}")]
    WorkerFailed(String),

    /// Wraps an underlying `std::io::Error`
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Map this error to the process exit code documented in the CLI contract
    ///
    /// - 1: archive open
    /// - 2: index load
    /// - 3: regex compilation
    /// - 4: invalid CLI arguments
    /// - 5: everything else (filesystem, suffix exhaustion, recurrence, worker failure, io)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ArchiveOpen(_) => 1,
            Self::IndexLoad(_) => 2,
            Self::RegexCompile(_) => 3,
            Self::InvalidArgs(_) => 4,
            Self::Filesystem(_)
            | Self::SuffixExhausted(_)
            | Self::MalformedRecurrence(_)
            | Self::WorkerFailed(_)
            | Self::Io(_) => 5,
        }
    }
}

/// Type alias for fallible return values throughout the crate
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn exit_codes_match_cli_contract() {
        assert_eq!(AppError::ArchiveOpen("x".into()).exit_code(), 1);
        assert_eq!(AppError::IndexLoad("x".into()).exit_code(), 2);
        assert_eq!(AppError::RegexCompile("x".into()).exit_code(), 3);
        assert_eq!(AppError::InvalidArgs("x".into()).exit_code(), 4);
        assert_eq!(AppError::Filesystem("x".into()).exit_code(), 5);
    }
}
