//! Idle time backends.
//!
//! Each backend asks a different part of the desktop stack how long the user
//! has been inactive. All of them are exposed through [`IdleSource`].

pub mod command;
pub mod logind;
pub mod mutter;
pub mod wayland;
pub mod x11;

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::domain::BackendKind;

pub use command::CommandSource;
pub use command::IdleTool;
pub use logind::LogindSource;
pub use mutter::MutterSource;
pub use wayland::WaylandSource;
pub use x11::X11Source;

/// Trait for idle time sources.
#[async_trait]
pub trait IdleSource: Send {
    /// Backend this source belongs to.
    fn kind(&self) -> BackendKind;

    /// Time since the last user input.
    async fn idle_time(&mut self) -> Result<Duration, IdleError>;
}

/// Errors that can occur in idle detection.
#[derive(Error, Debug)]
pub enum IdleError {
    #[error("{0}")]
    Unavailable(String),

    #[error("D-Bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("D-Bus call failed: {0}")]
    DBusCall(#[from] zbus::fdo::Error),

    #[error("Wayland error: {0}")]
    Wayland(String),

    #[error("X11 error: {0}")]
    X11(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid service pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Could not find a working monitor for backend: {0}")]
    NoWorkingBackend(BackendKind),
}

/// Construct the source for a concrete backend.
///
/// `Auto` is not a backend of its own; resolve it with
/// [`BackendKind::candidates`] first.
pub async fn connect(kind: BackendKind, config: &Config) -> Result<Box<dyn IdleSource>, IdleError> {
    let source: Box<dyn IdleSource> = match kind {
        BackendKind::Auto => {
            return Err(IdleError::Unavailable(
                "auto must be resolved to a concrete backend".to_string(),
            ));
        }
        BackendKind::Dbus => {
            let pattern = Regex::new(&config.dbus_service_pattern)?;
            Box::new(MutterSource::connect(&pattern).await?)
        }
        BackendKind::Logind => {
            Box::new(LogindSource::connect(config.resolved_session_id()).await?)
        }
        BackendKind::Wayland => Box::new(WaylandSource::connect(config.idle_threshold()).await?),
        BackendKind::X11 => Box::new(X11Source::connect().await?),
        BackendKind::Swayidle => Box::new(CommandSource::locate(
            IdleTool::Swayidle,
            config.swayidle_path.as_deref(),
        )?),
        BackendKind::Xprintidle => Box::new(CommandSource::locate(
            IdleTool::Xprintidle,
            config.xprintidle_path.as_deref(),
        )?),
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_is_rejected() {
        let err = connect(BackendKind::Auto, &Config::default())
            .await
            .err()
            .expect("auto should not connect");
        assert!(matches!(err, IdleError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_bus_access() {
        let config = Config {
            dbus_service_pattern: "(unclosed".to_string(),
            ..Config::default()
        };
        let err = connect(BackendKind::Dbus, &config).await.err().unwrap();
        assert!(matches!(err, IdleError::InvalidPattern(_)));
    }

    #[test]
    fn test_no_working_backend_message() {
        let err = IdleError::NoWorkingBackend(BackendKind::Wayland);
        assert_eq!(
            err.to_string(),
            "Could not find a working monitor for backend: wayland"
        );
    }
}
