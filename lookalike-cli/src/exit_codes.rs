//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use lookalike_core::LookalikeError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid matching options).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (input is not a decodable image).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file or reference directory.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write output).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            code: classify(err),
            message: Some(format!("{err:#}")),
        }
    }
}

/// Classify an error by the first recognized cause in its chain.
fn classify(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<LookalikeError>() {
            return match e {
                LookalikeError::ImageDecode(_) => DATA_ERROR,
                LookalikeError::InvalidConfig(_) => USAGE_ERROR,
                LookalikeError::Io(_) | LookalikeError::EntryUnavailable { .. } => INPUT_ERROR,
                _ => GENERAL_ERROR,
            };
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return match e.kind() {
                std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::WriteZero => IO_ERROR,
                _ => INPUT_ERROR,
            };
        }
        if cause.is::<serde_json::Error>() {
            return IO_ERROR;
        }
    }
    GENERAL_ERROR
}
