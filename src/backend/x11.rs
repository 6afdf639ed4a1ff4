//! Idle time from the X11 MIT-SCREEN-SAVER extension.
//!
//! This is the query `xprintidle` performs, done in-process.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing::trace;
use x11rb::connection::Connection as _;
use x11rb::connection::RequestConnection as _;
use x11rb::protocol::screensaver;
use x11rb::protocol::xproto::Window;
use x11rb::rust_connection::RustConnection;

use super::IdleError;
use super::IdleSource;
use crate::domain::BackendKind;

/// Idle source that queries the X server directly.
pub struct X11Source {
    conn: Arc<RustConnection>,
    root: Window,
}

impl X11Source {
    /// Connect to the X server named by `DISPLAY`.
    pub async fn connect() -> Result<Self, IdleError> {
        tokio::task::spawn_blocking(|| {
            let (conn, screen_num) = x11rb::connect(None).map_err(x11_error)?;

            let root = conn
                .setup()
                .roots
                .get(screen_num)
                .map(|screen| screen.root)
                .ok_or_else(|| IdleError::X11(format!("screen {screen_num} not found")))?;

            if conn
                .extension_information(screensaver::X11_EXTENSION_NAME)
                .map_err(x11_error)?
                .is_none()
            {
                return Err(IdleError::Unavailable(
                    "X server lacks the MIT-SCREEN-SAVER extension".to_string(),
                ));
            }

            info!("Connected to X server, screen {}", screen_num);
            Ok(Self {
                conn: Arc::new(conn),
                root,
            })
        })
        .await?
    }
}

#[async_trait]
impl IdleSource for X11Source {
    fn kind(&self) -> BackendKind {
        BackendKind::X11
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let conn = Arc::clone(&self.conn);
        let root = self.root;

        tokio::task::spawn_blocking(move || {
            let reply = screensaver::query_info(conn.as_ref(), root)
                .map_err(x11_error)?
                .reply()
                .map_err(x11_error)?;
            trace!("ms_since_user_input: {}", reply.ms_since_user_input);

            Ok(Duration::from_millis(u64::from(reply.ms_since_user_input)))
        })
        .await?
    }
}

fn x11_error(e: impl std::fmt::Display) -> IdleError {
    IdleError::X11(e.to_string())
}
