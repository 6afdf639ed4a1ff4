//! dbus-idle - Report how long the desktop session has been idle.
//!
//! Idle time comes from one of several backends: a session bus
//! `IdleMonitor` service, systemd-logind, the Wayland `ext-idle-notify-v1`
//! protocol, the X11 screen saver extension, or the `swayidle` and
//! `xprintidle` tools.

pub mod backend;
pub mod config;
pub mod domain;
pub mod monitor;
pub mod watch;

pub use backend::IdleError;
pub use backend::IdleSource;
pub use config::Config;
pub use domain::Activity;
pub use domain::BackendKind;
pub use monitor::IdleMonitor;

/// Get the current version from Cargo.toml.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
