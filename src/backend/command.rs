//! Idle time from external command-line tools.
//!
//! Spawns `swayidle` or `xprintidle` and parses what they print.

use async_trait::async_trait;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;

use super::IdleError;
use super::IdleSource;
use crate::domain::BackendKind;

/// External tool that prints an idle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleTool {
    /// Prints seconds.
    Swayidle,
    /// Prints milliseconds.
    Xprintidle,
}

impl IdleTool {
    /// Binary name looked up on PATH.
    pub fn binary(self) -> &'static str {
        match self {
            Self::Swayidle => "swayidle",
            Self::Xprintidle => "xprintidle",
        }
    }

    fn args(self) -> &'static [&'static str] {
        match self {
            Self::Swayidle => &["--idle", "1"],
            Self::Xprintidle => &[],
        }
    }

    fn kind(self) -> BackendKind {
        match self {
            Self::Swayidle => BackendKind::Swayidle,
            Self::Xprintidle => BackendKind::Xprintidle,
        }
    }

    /// Parse the tool's stdout into an idle duration.
    pub fn parse_output(self, output: &str) -> Result<Duration, IdleError> {
        let trimmed = output.trim();
        let value: f64 = trimmed.parse().map_err(|e| {
            IdleError::Parse(format!("{} printed {:?}: {}", self.binary(), trimmed, e))
        })?;

        let seconds = match self {
            Self::Swayidle => value,
            Self::Xprintidle => value / 1000.0,
        };

        Duration::try_from_secs_f64(seconds).map_err(|e| {
            IdleError::Parse(format!("{} printed {:?}: {}", self.binary(), trimmed, e))
        })
    }
}

/// Idle source that runs an external tool on every query.
#[derive(Debug)]
pub struct CommandSource {
    tool: IdleTool,
    path: PathBuf,
}

impl CommandSource {
    /// Locate the tool binary; fails if it is not installed.
    pub fn locate(tool: IdleTool, configured_path: Option<&Path>) -> Result<Self, IdleError> {
        let path = find_tool(tool, configured_path)?;
        info!("Using {}: {}", tool.binary(), path.display());
        Ok(Self { tool, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn query(&self) -> Result<Duration, IdleError> {
        debug!("Running {} {}", self.path.display(), self.tool.args().join(" "));

        let output = Command::new(&self.path)
            .args(self.tool.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| IdleError::Command(format!("failed to spawn {}: {}", self.tool.binary(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IdleError::Command(format!(
                "{} exited with code {:?}: {}",
                self.tool.binary(),
                output.status.code(),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("{} output: {}", self.tool.binary(), stdout.trim());
        self.tool.parse_output(&stdout)
    }
}

#[async_trait]
impl IdleSource for CommandSource {
    fn kind(&self) -> BackendKind {
        self.tool.kind()
    }

    /// A failed query is logged and reported as no idle time.
    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        match self.query().await {
            Ok(idle) => Ok(idle),
            Err(e) => {
                error!("Failed to get idle time from {}: {}", self.tool.binary(), e);
                Ok(Duration::ZERO)
            }
        }
    }
}

/// Find the tool binary.
fn find_tool(tool: IdleTool, configured_path: Option<&Path>) -> Result<PathBuf, IdleError> {
    // Use configured path if provided
    if let Some(path) = configured_path {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(IdleError::Unavailable(format!(
            "Configured {} path does not exist: {}",
            tool.binary(),
            path.display()
        )));
    }

    which::which(tool.binary()).map_err(|_| {
        IdleError::Unavailable(format!("{} not available on this system", tool.binary()))
    })
}
