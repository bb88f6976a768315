use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single device command. Callers inside the sampling loop
/// treat every variant as an empty read.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to spawn adb: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("`{0}` timed out after {1}s")]
    Timeout(String, u64),
    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
    #[error("adb produced no stdout pipe")]
    NoStdout,
}

/// Fatal conditions detected before sampling starts.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Could not find adb at {}", .0.display())]
    AdbNotFound(PathBuf),
    #[error("Could not find android device")]
    NoDevice,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::AdbNotFound(_) => 1,
            StartupError::NoDevice | StartupError::Device(_) => 3,
        }
    }
}
