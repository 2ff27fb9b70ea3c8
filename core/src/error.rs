use std::{io, path::PathBuf};

use crate::str_interp::InterpError;

pub type Result<T> = std::result::Result<T, JudgeError>;

/// Errors that abort a whole run (or a whole solution's batch).
///
/// Anything that goes wrong while a single test executes is folded into
/// [`Status::Failure`](crate::testing::Status::Failure) instead.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("Missing {0} '{}'", .1.to_string_lossy())]
    MissingFile(&'static str, PathBuf),

    #[error("No test cases found in '{}'", .0.to_string_lossy())]
    NoTestcases(PathBuf),

    #[error("Failed to spawn '{0}': {1}")]
    Spawn(String, #[source] io::Error),

    #[error("Invalid launch template for '{0}': {1}")]
    LaunchTemplate(String, #[source] InterpError),

    #[error("Solution '{0}' is not listed in the problem config")]
    UnknownSolution(String),

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}
