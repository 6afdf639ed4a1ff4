//! Idle time from an `IdleMonitor` service on the session bus.
//!
//! GNOME Shell exports `org.gnome.Mutter.IdleMonitor` with a `Core` object
//! whose `GetIdletime` method returns milliseconds since the last input.

use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;
use tracing::debug;
use tracing::info;
use tracing::trace;
use zbus::Connection;

use super::IdleError;
use super::IdleSource;
use crate::domain::BackendKind;

/// Idle source backed by a session bus idle monitor service.
#[derive(Debug)]
pub struct MutterSource {
    conn: Connection,
    service: String,
    path: String,
}

impl MutterSource {
    /// Connect to the session bus and find a service matching `pattern`.
    pub async fn connect(pattern: &Regex) -> Result<Self, IdleError> {
        let conn = Connection::session().await?;
        Self::connect_with(conn, pattern).await
    }

    /// Find a service matching `pattern` on an existing connection.
    pub async fn connect_with(conn: Connection, pattern: &Regex) -> Result<Self, IdleError> {
        let service = find_service(&conn, pattern).await?.ok_or_else(|| {
            IdleError::Unavailable("D-Bus IdleMonitor service not available".to_string())
        })?;
        let path = core_object_path(&service);
        info!("Using D-Bus idle monitor {} at {}", service, path);

        Ok(Self {
            conn,
            service,
            path,
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl IdleSource for MutterSource {
    fn kind(&self) -> BackendKind {
        BackendKind::Dbus
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        // The interface name is the same as the well-known service name
        let proxy = zbus::Proxy::new(
            &self.conn,
            self.service.as_str(),
            self.path.as_str(),
            self.service.as_str(),
        )
        .await?;

        let millis: u64 = proxy.call("GetIdletime", &()).await?;
        trace!("GetIdletime: {} ms", millis);

        Ok(Duration::from_millis(millis))
    }
}

/// Find the first well-known bus name matching `pattern`.
///
/// Names are sorted so the choice does not depend on bus ordering.
async fn find_service(conn: &Connection, pattern: &Regex) -> Result<Option<String>, IdleError> {
    let dbus = zbus::fdo::DBusProxy::new(conn).await?;
    let names = dbus.list_names().await?;

    let mut candidates: Vec<String> = names
        .iter()
        .map(|name| name.as_str().to_string())
        .filter(|name| !name.starts_with(':'))
        .filter(|name| pattern.is_match(name))
        .collect();
    candidates.sort();

    debug!("Idle monitor candidates on session bus: {:?}", candidates);
    Ok(candidates.into_iter().next())
}

/// Object path of the `Core` idle monitor for a service name.
fn core_object_path(service: &str) -> String {
    format!("/{}/Core", service.replace('.', "/"))
}
