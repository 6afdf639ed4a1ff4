//! Idle detection via the `ext-idle-notify-v1` Wayland protocol.
//!
//! The compositor only tells us when the seat crosses the idle timeout and
//! when input resumes, so idle time is derived from those two events.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;
use wayland_client::Connection;
use wayland_client::delegate_noop;
use wayland_client::Dispatch;
use wayland_client::EventQueue;
use wayland_client::globals::GlobalListContents;
use wayland_client::globals::registry_queue_init;
use wayland_client::protocol::wl_registry;
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::QueueHandle;
use wayland_protocols::ext::idle_notify::v1::client::ext_idle_notification_v1::ExtIdleNotificationV1;
use wayland_protocols::ext::idle_notify::v1::client::ext_idle_notification_v1;
use wayland_protocols::ext::idle_notify::v1::client::ext_idle_notifier_v1::ExtIdleNotifierV1;

use super::IdleError;
use super::IdleSource;
use crate::domain::BackendKind;

/// Highest `wl_seat` version we bind.
const MAX_SEAT_VERSION: u32 = 7;

/// Idle source backed by an `ext_idle_notification_v1` object.
pub struct WaylandSource {
    inner: Arc<Mutex<WaylandInner>>,
}

impl WaylandSource {
    /// Connect to the compositor named by `WAYLAND_DISPLAY`/`WAYLAND_SOCKET`.
    pub async fn connect(threshold: Duration) -> Result<Self, IdleError> {
        let inner = tokio::task::spawn_blocking(move || {
            let conn = Connection::connect_to_env().map_err(wayland_error)?;
            WaylandInner::new(conn, threshold)
        })
        .await??;

        Ok(Self::from_inner(inner))
    }

    /// Set up idle notifications on an existing connection.
    pub async fn connect_with(conn: Connection, threshold: Duration) -> Result<Self, IdleError> {
        let inner = tokio::task::spawn_blocking(move || WaylandInner::new(conn, threshold)).await??;
        Ok(Self::from_inner(inner))
    }

    fn from_inner(inner: WaylandInner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

#[async_trait]
impl IdleSource for WaylandSource {
    fn kind(&self) -> BackendKind {
        BackendKind::Wayland
    }

    async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        let inner = Arc::clone(&self.inner);

        tokio::task::spawn_blocking(move || {
            let mut inner = inner
                .lock()
                .map_err(|_| IdleError::Wayland("idle state lock poisoned".to_string()))?;
            inner.refresh()?;
            Ok(inner.state.idle_time(Instant::now()))
        })
        .await?
    }
}

/// Connection, queue and protocol objects; all blocking calls happen here.
struct WaylandInner {
    conn: Connection,
    queue: EventQueue<IdleState>,
    state: IdleState,
    notification: ExtIdleNotificationV1,
}

impl WaylandInner {
    fn new(conn: Connection, threshold: Duration) -> Result<Self, IdleError> {
        let (globals, mut queue) =
            registry_queue_init::<IdleState>(&conn).map_err(wayland_error)?;
        let qh = queue.handle();

        let seat: WlSeat = globals
            .bind(&qh, 1..=MAX_SEAT_VERSION, ())
            .map_err(|e| IdleError::Unavailable(format!("No Wayland seat found: {e}")))?;

        let notifier: ExtIdleNotifierV1 = globals.bind(&qh, 1..=1, ()).map_err(|e| {
            IdleError::Unavailable(format!("ext-idle-notify manager not found: {e}"))
        })?;

        let timeout_ms = timeout_millis(threshold);
        let notification = notifier.get_idle_notification(timeout_ms, &seat, &qh, ());
        debug!("Requested idle notification with timeout {} ms", timeout_ms);

        // Track the timeout the compositor was actually given
        let effective = Duration::from_millis(u64::from(timeout_ms));
        let mut state = IdleState::new(effective, Instant::now());
        queue.roundtrip(&mut state).map_err(wayland_error)?;
        info!("Wayland idle notifications active");

        Ok(Self {
            conn,
            queue,
            state,
            notification,
        })
    }

    /// Process everything the compositor has sent so far.
    fn refresh(&mut self) -> Result<(), IdleError> {
        self.queue.roundtrip(&mut self.state).map_err(wayland_error)?;
        Ok(())
    }
}

impl Drop for WaylandInner {
    fn drop(&mut self) {
        self.notification.destroy();
        let _ = self.conn.flush();
    }
}

/// Idle bookkeeping driven by notification events.
#[derive(Debug)]
struct IdleState {
    threshold: Duration,

    /// When the compositor reported the seat idle.
    idle_since: Option<Instant>,

    /// Last known input, or when monitoring started.
    last_activity: Instant,
}

impl IdleState {
    fn new(threshold: Duration, now: Instant) -> Self {
        Self {
            threshold,
            idle_since: None,
            last_activity: now,
        }
    }

    fn on_idled(&mut self, now: Instant) {
        self.idle_since = Some(now);
    }

    fn on_resumed(&mut self, now: Instant) {
        self.idle_since = None;
        self.last_activity = now;
    }

    /// The `idled` event fires once the seat has been inactive for the whole
    /// threshold, so that much is added to the time since the event.
    fn idle_time(&self, now: Instant) -> Duration {
        match self.idle_since {
            Some(since) => self
                .threshold
                .saturating_add(now.saturating_duration_since(since)),
            None => now
                .saturating_duration_since(self.last_activity)
                .min(self.threshold),
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for IdleState {
    fn event(
        _state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ExtIdleNotificationV1, ()> for IdleState {
    fn event(
        state: &mut Self,
        _notification: &ExtIdleNotificationV1,
        event: ext_idle_notification_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            ext_idle_notification_v1::Event::Idled => {
                debug!("Compositor reports seat idle");
                state.on_idled(Instant::now());
            }
            ext_idle_notification_v1::Event::Resumed => {
                debug!("Compositor reports activity resumed");
                state.on_resumed(Instant::now());
            }
            _ => trace!("Ignoring unknown idle notification event"),
        }
    }
}

delegate_noop!(IdleState: ignore WlSeat);
delegate_noop!(IdleState: ExtIdleNotifierV1);

/// A global advertised by the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalInfo {
    pub interface: String,
    pub version: u32,
}

/// List every global the compositor advertises.
pub fn list_globals() -> Result<Vec<GlobalInfo>, IdleError> {
    let conn = Connection::connect_to_env().map_err(wayland_error)?;
    list_globals_with(&conn)
}

/// List every global advertised on an existing connection.
pub fn list_globals_with(conn: &Connection) -> Result<Vec<GlobalInfo>, IdleError> {
    let (globals, _queue) = registry_queue_init::<IdleState>(conn).map_err(wayland_error)?;

    Ok(globals
        .contents()
        .clone_list()
        .into_iter()
        .map(|global| GlobalInfo {
            interface: global.interface,
            version: global.version,
        })
        .collect())
}

/// Idle timeout in milliseconds, saturating at the protocol's `u32` limit.
fn timeout_millis(threshold: Duration) -> u32 {
    u32::try_from(threshold.as_millis()).unwrap_or(u32::MAX)
}

fn wayland_error(e: impl std::fmt::Display) -> IdleError {
    IdleError::Wayland(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(120);

    #[test]
    fn test_active_time_counts_from_start() {
        let start = Instant::now();
        let state = IdleState::new(THRESHOLD, start);
        assert_eq!(
            state.idle_time(start + Duration::from_secs(30)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_active_time_capped_at_threshold() {
        let start = Instant::now();
        let state = IdleState::new(THRESHOLD, start);
        assert_eq!(state.idle_time(start + Duration::from_secs(500)), THRESHOLD);
    }

    #[test]
    fn test_idled_adds_threshold() {
        let start = Instant::now();
        let mut state = IdleState::new(THRESHOLD, start);
        state.on_idled(start + Duration::from_secs(200));

        assert_eq!(
            state.idle_time(start + Duration::from_secs(210)),
            THRESHOLD + Duration::from_secs(10)
        );
    }

    #[test]
    fn test_resumed_resets_activity() {
        let start = Instant::now();
        let mut state = IdleState::new(THRESHOLD, start);
        state.on_idled(start + Duration::from_secs(200));
        state.on_resumed(start + Duration::from_secs(300));

        assert!(state.idle_since.is_none());
        assert_eq!(
            state.idle_time(start + Duration::from_secs(305)),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_secs(120)), 120_000);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX / 2)), u32::MAX);
    }

    #[test]
    fn test_huge_threshold_does_not_overflow() {
        let start = Instant::now();
        let mut state = IdleState::new(Duration::MAX, start);
        state.on_idled(start);

        assert_eq!(state.idle_time(start + Duration::from_secs(1)), Duration::MAX);
    }

    #[test]
    fn test_idle_time_uses_capped_timeout() {
        let timeout = Duration::from_millis(u64::from(timeout_millis(Duration::from_secs(
            u64::MAX,
        ))));
        assert_eq!(timeout, Duration::from_millis(u64::from(u32::MAX)));

        let start = Instant::now();
        let mut state = IdleState::new(timeout, start);
        state.on_idled(start);
        assert_eq!(
            state.idle_time(start + Duration::from_secs(1)),
            timeout + Duration::from_secs(1)
        );
    }
}
