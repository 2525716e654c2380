//! Error type shared by every stage of an alignment run.
//!
//! Device failures are never retried: a failed call unwinds to
//! [`crate::main`], which reports it and exits with a non-zero status.

use thiserror::Error;

/// Everything that can stop an alignment run.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable compute platform/adapter was found at startup.
    #[error("no compute device found: {0}")]
    NoDevice(String),

    /// The device could not satisfy a buffer request.
    #[error("allocation of {requested} bytes failed (limit {limit} bytes): {reason}")]
    Allocation {
        /// Requested size in bytes
        requested: u64,
        /// Largest size the device accepts in a single binding
        limit: u64,
        /// Back end message
        reason: String,
    },

    /// Bad argument, bad buffer size, bad kernel argument. Always a defect.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// Kernel source failed to compile. `log` is the back end output.
    #[error("kernel build failed:\n{log}")]
    Build {
        /// Compiler/validation log, verbatim
        log: String,
    },

    /// A device call failed mid-run.
    #[error("device operation `{op}` failed: {message}")]
    Device {
        /// Name of the failing operation
        op: &'static str,
        /// Decoded back end error
        message: String,
    },

    /// Scoring parameters outside the supported range.
    #[error("invalid scoring parameters: {0}")]
    InvalidScoring(String),

    /// A sequence contains symbols outside the alphabet.
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    /// A sequence file could not be read or parsed.
    #[error("could not read sequence from {path}: {message}")]
    SequenceInput {
        /// Input path
        path: String,
        /// Parser message
        message: String,
    },

    /// The scan-based matrix disagrees with the sequential reference.
    #[error("verification failed at H[{row}][{col}]: reference {expected}, scan {found}")]
    VerificationFailed {
        /// Row index
        row: usize,
        /// Column index
        col: usize,
        /// Reference value
        expected: i32,
        /// Scan engine value
        found: i32,
    },

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rayon pool could not be created
    #[error("could not build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The logger was already initialised
    #[error("could not initialise logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
