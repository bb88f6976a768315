//! Shell access to the connected Android device.
//!
//! Everything the sampler knows about the device arrives as text through
//! [`Transport`]. The real implementation shells out to `adb`; tests provide
//! scripted in-memory devices.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{DeviceError, StartupError};

/// Runs shell commands on a device and hands back their standard output.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Run `command` and capture its whole stdout.
    async fn shell(&self, command: &str) -> Result<String, DeviceError>;

    /// Run `command` and feed stdout to `on_line` one line at a time until
    /// the stream ends.
    async fn stream_shell<F>(&self, command: &str, on_line: F) -> Result<(), DeviceError>
    where
        F: FnMut(&str);
}

#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    command_timeout: Duration,
}

impl AdbClient {
    pub fn new(adb_path: &Path, command_timeout: Duration) -> Result<Self, StartupError> {
        if !adb_path.exists() {
            return Err(StartupError::AdbNotFound(adb_path.to_path_buf()));
        }
        Ok(Self {
            adb_path: adb_path.to_path_buf(),
            command_timeout,
        })
    }

    pub fn adb_path(&self) -> &Path {
        &self.adb_path
    }

    /// Serials of devices in the `device` state, as reported by `adb devices`.
    pub async fn connected_devices(&self) -> Result<Vec<String>, DeviceError> {
        let output = self.run(&["devices"], "devices").await?;
        Ok(parse_device_list(&output))
    }

    /// Whether `program` is on the device's PATH.
    pub async fn has_program(&self, program: &str) -> bool {
        match self.shell(&format!("which {program}")).await {
            Ok(out) => !out.trim().is_empty(),
            Err(err) => {
                tracing::debug!(%err, program, "which failed");
                false
            }
        }
    }

    /// adb invocation in its own process group, so a Ctrl+C from the
    /// terminal reaches droidmon but not a read that is still running.
    fn command(&self) -> Command {
        let mut command = Command::new(&self.adb_path);
        command.stdin(Stdio::null()).kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }

    async fn run(&self, args: &[&str], label: &str) -> Result<String, DeviceError> {
        let secs = self.command_timeout.as_secs();
        let output = timeout(self.command_timeout, self.command().args(args).output())
            .await
            .map_err(|_| DeviceError::Timeout(label.to_string(), secs))??;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: label.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Transport for AdbClient {
    async fn shell(&self, command: &str) -> Result<String, DeviceError> {
        let mut args = vec!["shell"];
        args.extend(command.split_whitespace());
        self.run(&args, command).await
    }

    async fn stream_shell<F>(&self, command: &str, mut on_line: F) -> Result<(), DeviceError>
    where
        F: FnMut(&str),
    {
        let mut child = self
            .command()
            .arg("shell")
            .args(command.split_whitespace())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child.stdout.take().ok_or(DeviceError::NoStdout)?;
        let mut lines = BufReader::new(stdout).lines();

        let drain = async {
            while let Some(line) = lines.next_line().await? {
                on_line(&line);
            }
            child.wait().await
        };

        let status = timeout(self.command_timeout, drain)
            .await
            .map_err(|_| DeviceError::Timeout(command.to_string(), self.command_timeout.as_secs()))??;

        if !status.success() {
            tracing::debug!(command, ?status, "streamed command exited unsuccessfully");
        }
        Ok(())
    }
}

/// Extract serials from `adb devices` output, skipping the banner, daemon
/// notices and devices that are offline or unauthorized.
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            (parts.next()? == "device").then(|| serial.to_string())
        })
        .collect()
}
