//! Domain types shared by backends, the monitor and the CLI.

use clap::ValueEnum;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/// Idle detection backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Pick the first working backend for the current session.
    Auto,
    /// `*IdleMonitor` service on the session bus (GNOME/Mutter).
    #[default]
    Dbus,
    /// `ext-idle-notify-v1` Wayland protocol.
    Wayland,
    /// `swayidle` command.
    Swayidle,
    /// `xprintidle` command.
    Xprintidle,
    /// X11 MIT-SCREEN-SAVER extension.
    X11,
    /// systemd-logind session idle hint.
    Logind,
}

impl BackendKind {
    /// Get the backend name as used on the command line and in config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Dbus => "dbus",
            Self::Wayland => "wayland",
            Self::Swayidle => "swayidle",
            Self::Xprintidle => "xprintidle",
            Self::X11 => "x11",
            Self::Logind => "logind",
        }
    }

    /// Backends to try, in order, when this kind is requested.
    ///
    /// Concrete kinds resolve to themselves. `Auto` depends on the kind of
    /// graphical session; a session that is both (`XWayland`) counts as Wayland.
    pub fn candidates(self, has_wayland: bool, has_x11: bool) -> Vec<BackendKind> {
        match self {
            Self::Auto if has_wayland => {
                vec![Self::Wayland, Self::Dbus, Self::Logind, Self::Swayidle]
            }
            Self::Auto if has_x11 => vec![Self::Dbus, Self::X11, Self::Xprintidle, Self::Logind],
            Self::Auto => vec![Self::Dbus, Self::Logind],
            kind => vec![kind],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the user is considered present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Idle,
}

impl Activity {
    /// Lowercase name, as printed in watch output and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_kind_is_its_own_candidate() {
        assert_eq!(
            BackendKind::Xprintidle.candidates(true, true),
            vec![BackendKind::Xprintidle]
        );
        assert_eq!(BackendKind::Dbus.candidates(false, false), vec![BackendKind::Dbus]);
    }

    #[test]
    fn test_auto_candidates_by_session() {
        assert_eq!(
            BackendKind::Auto.candidates(true, false)[0],
            BackendKind::Wayland
        );
        // XWayland session still prefers the Wayland protocol
        assert_eq!(
            BackendKind::Auto.candidates(true, true)[0],
            BackendKind::Wayland
        );
        assert!(BackendKind::Auto
            .candidates(false, true)
            .contains(&BackendKind::X11));
        assert_eq!(
            BackendKind::Auto.candidates(false, false),
            vec![BackendKind::Dbus, BackendKind::Logind]
        );
    }

    #[test]
    fn test_auto_never_a_candidate() {
        for (wl, x) in [(true, true), (true, false), (false, true), (false, false)] {
            assert!(!BackendKind::Auto.candidates(wl, x).contains(&BackendKind::Auto));
        }
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: BackendKind,
        }

        let w: Wrapper = toml::from_str(r#"backend = "xprintidle""#).unwrap();
        assert_eq!(w.backend, BackendKind::Xprintidle);
        let w: Wrapper = toml::from_str(r#"backend = "x11""#).unwrap();
        assert_eq!(w.backend, BackendKind::X11);
    }

    #[test]
    fn test_display_matches_cli_name() {
        for kind in BackendKind::value_variants() {
            let parsed = BackendKind::from_str(kind.as_str(), false).unwrap();
            assert_eq!(parsed, *kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn test_activity_names() {
        assert_eq!(Activity::Active.as_str(), "active");
        assert_eq!(Activity::Idle.to_string(), "idle");
    }
}
