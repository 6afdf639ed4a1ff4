//! Idle detection via systemd-logind `DBus` interface.
//!
//! Reads `IdleHint` and `IdleSinceHint` from the current session.

use async_trait::async_trait;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tracing::debug;
use tracing::info;
use tracing::trace;
use zbus::Connection;

use super::IdleError;
use super::IdleSource;
use crate::domain::BackendKind;

/// `DBus` service and path for login1.
const LOGIND_SERVICE: &str = "org.freedesktop.login1";
const LOGIND_PATH: &str = "/org/freedesktop/login1";
const MANAGER_INTERFACE: &str = "org.freedesktop.login1.Manager";
const SESSION_INTERFACE: &str = "org.freedesktop.login1.Session";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Idle source that reads the logind session idle hint.
#[derive(Debug)]
pub struct LogindSource {
    conn: Connection,

    /// Session object path in `DBus`.
    session_path: String,
}

impl LogindSource {
    /// Connect to the system bus and resolve the session path.
    pub async fn connect(session_id: Option<String>) -> Result<Self, IdleError> {
        let conn = Connection::system().await?;
        Self::connect_with(conn, session_id).await
    }

    /// Resolve the session path on an existing connection.
    pub async fn connect_with(
        conn: Connection,
        session_id: Option<String>,
    ) -> Result<Self, IdleError> {
        let session_path = resolve_session_path(&conn, session_id.as_deref()).await?;
        info!("Resolved session path: {}", session_path);

        Ok(Self { conn, session_path })
    }

    pub fn session_path(&self) -> &str {
        &self.session_path
    }
}

#[async_trait]
impl IdleSource for LogindSource {
    fn kind(&self) -> BackendKind {
        BackendKind::Logind
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let idle = get_idle_hint(&self.conn, &self.session_path).await?;
        if !idle {
            trace!("IdleHint: false");
            return Ok(Duration::ZERO);
        }

        let since_us = get_idle_since_hint(&self.conn, &self.session_path).await?;
        trace!("IdleHint: true, IdleSinceHint: {}", since_us);

        Ok(idle_duration_since(since_us, SystemTime::now()))
    }
}

/// Time elapsed since a realtime timestamp in microseconds.
///
/// Timestamps in the future yield zero.
fn idle_duration_since(since_us: u64, now: SystemTime) -> Duration {
    let since = UNIX_EPOCH + Duration::from_micros(since_us);
    now.duration_since(since).unwrap_or_default()
}

/// Resolve the session object path for the current session.
async fn resolve_session_path(conn: &Connection, session_id: Option<&str>) -> Result<String, IdleError> {
    // First try the explicit session id if available
    if let Some(session_id) = session_id {
        debug!("Using session id: {}", session_id);
        return get_session_by_id(conn, session_id).await;
    }

    debug!("No session id set, trying to find current session");

    // Try "self" or "auto" session
    let self_path = format!("{LOGIND_PATH}/session/self");
    if check_session_exists(conn, &self_path).await {
        return Ok(self_path);
    }

    let auto_path = format!("{LOGIND_PATH}/session/auto");
    if check_session_exists(conn, &auto_path).await {
        return Ok(auto_path);
    }

    Err(IdleError::Unavailable(
        "Could not resolve session path. Set XDG_SESSION_ID or ensure logind session is available."
            .to_string(),
    ))
}

/// Get session object path by session ID via Manager.GetSession.
async fn get_session_by_id(conn: &Connection, session_id: &str) -> Result<String, IdleError> {
    let proxy = zbus::Proxy::new(conn, LOGIND_SERVICE, LOGIND_PATH, MANAGER_INTERFACE).await?;

    let path: zbus::zvariant::OwnedObjectPath = proxy.call("GetSession", &(session_id,)).await?;

    Ok(path.to_string())
}

/// Check if a session path exists by trying to get `IdleHint`.
async fn check_session_exists(conn: &Connection, path: &str) -> bool {
    get_idle_hint(conn, path).await.is_ok()
}

/// Read a session property through `org.freedesktop.DBus.Properties`.
async fn get_session_property(
    conn: &Connection,
    session_path: &str,
    name: &str,
) -> Result<zbus::zvariant::OwnedValue, IdleError> {
    let proxy =
        zbus::Proxy::new(conn, LOGIND_SERVICE, session_path, PROPERTIES_INTERFACE).await?;

    let value: zbus::zvariant::OwnedValue = proxy.call("Get", &(SESSION_INTERFACE, name)).await?;
    Ok(value)
}

/// Get the `IdleHint` property from a session.
async fn get_idle_hint(conn: &Connection, session_path: &str) -> Result<bool, IdleError> {
    let value = get_session_property(conn, session_path, "IdleHint").await?;

    value
        .downcast_ref::<bool>()
        .map_err(|_| IdleError::Parse("IdleHint is not a boolean".to_string()))
}

/// Get the `IdleSinceHint` property (realtime microseconds) from a session.
async fn get_idle_since_hint(conn: &Connection, session_path: &str) -> Result<u64, IdleError> {
    let value = get_session_property(conn, session_path, "IdleSinceHint").await?;

    value
        .downcast_ref::<u64>()
        .map_err(|_| IdleError::Parse("IdleSinceHint is not an unsigned integer".to_string()))
}
