//! Idle monitor: picks a working backend and answers "is the user idle?".

use std::env;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend;
use crate::backend::IdleError;
use crate::backend::IdleSource;
use crate::config::Config;
use crate::domain::Activity;
use crate::domain::BackendKind;

/// Idle monitor over a single backend.
pub struct IdleMonitor {
    source: Box<dyn IdleSource>,

    /// Idle time above which the session counts as idle.
    threshold: Duration,
}

impl IdleMonitor {
    /// Wrap an already connected source.
    pub fn new(source: Box<dyn IdleSource>, threshold: Duration) -> Self {
        Self { source, threshold }
    }

    /// Build a monitor for `kind`, falling back through `auto` candidates.
    pub async fn get_monitor(kind: BackendKind, config: &Config) -> Result<Self, IdleError> {
        let has_wayland = env::var_os("WAYLAND_DISPLAY").is_some();
        let has_x11 = env::var_os("DISPLAY").is_some();
        let candidates = kind.candidates(has_wayland, has_x11);
        debug!(
            "Backend {} resolves to candidates {:?} (wayland={}, x11={})",
            kind, candidates, has_wayland, has_x11
        );

        let source = first_working(kind, &candidates, |candidate| {
            backend::connect(candidate, config)
        })
        .await?;

        Ok(Self::new(source, config.idle_threshold()))
    }

    pub fn backend(&self) -> BackendKind {
        self.source.kind()
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Time since the last user input.
    pub async fn idle_time(&mut self) -> Result<Duration, IdleError> {
        self.source.idle_time().await
    }

    /// Check if the session has been idle for longer than the threshold.
    pub async fn is_idle(&mut self) -> Result<bool, IdleError> {
        Ok(self.activity().await? == Activity::Idle)
    }

    /// Current activity of the session.
    pub async fn activity(&mut self) -> Result<Activity, IdleError> {
        let idle = self.idle_time().await?;
        Ok(classify(idle, self.threshold))
    }
}

/// Activity for an idle time; the threshold itself still counts as active.
pub fn classify(idle_time: Duration, threshold: Duration) -> Activity {
    if idle_time > threshold {
        Activity::Idle
    } else {
        Activity::Active
    }
}

/// Try each candidate in order and return the first source that connects.
async fn first_working<F, Fut>(
    requested: BackendKind,
    candidates: &[BackendKind],
    mut connect: F,
) -> Result<Box<dyn IdleSource>, IdleError>
where
    F: FnMut(BackendKind) -> Fut,
    Fut: Future<Output = Result<Box<dyn IdleSource>, IdleError>>,
{
    for &candidate in candidates {
        match connect(candidate).await {
            Ok(source) => {
                info!("Using {} backend", candidate);
                return Ok(source);
            }
            Err(e) => warn!("Could not load {} backend: {}", candidate, e),
        }
    }

    Err(IdleError::NoWorkingBackend(requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct FixedSource {
        kind: BackendKind,
        idle: Duration,
    }

    #[async_trait]
    impl IdleSource for FixedSource {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn idle_time(&mut self) -> Result<Duration, IdleError> {
            Ok(self.idle)
        }
    }

    fn fixed(kind: BackendKind, secs: u64) -> Box<dyn IdleSource> {
        Box::new(FixedSource {
            kind,
            idle: Duration::from_secs(secs),
        })
    }

    #[test]
    fn test_classify_is_strict() {
        let threshold = Duration::from_secs(120);
        assert_eq!(classify(Duration::from_secs(119), threshold), Activity::Active);
        assert_eq!(classify(threshold, threshold), Activity::Active);
        assert_eq!(
            classify(threshold + Duration::from_millis(1), threshold),
            Activity::Idle
        );
    }

    #[tokio::test]
    async fn test_is_idle_uses_threshold() {
        let mut monitor = IdleMonitor::new(fixed(BackendKind::Dbus, 300), Duration::from_secs(120));
        assert!(monitor.is_idle().await.unwrap());
        assert_eq!(monitor.idle_time().await.unwrap(), Duration::from_secs(300));

        let mut monitor = IdleMonitor::new(fixed(BackendKind::Dbus, 5), Duration::from_secs(120));
        assert!(!monitor.is_idle().await.unwrap());
        assert_eq!(monitor.backend(), BackendKind::Dbus);
    }

    #[tokio::test]
    async fn test_first_working_falls_through() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&attempts);

        let source = first_working(
            BackendKind::Auto,
            &[BackendKind::Wayland, BackendKind::Dbus, BackendKind::Logind],
            move |kind| {
                seen.lock().unwrap().push(kind);
                async move {
                    if kind == BackendKind::Dbus {
                        Ok(fixed(kind, 1))
                    } else {
                        Err(IdleError::Unavailable(format!("{kind} missing")))
                    }
                }
            },
        )
        .await
        .ok()
        .expect("dbus should connect");

        assert_eq!(source.kind(), BackendKind::Dbus);
        // Stops at the first success
        assert_eq!(
            *attempts.lock().unwrap(),
            vec![BackendKind::Wayland, BackendKind::Dbus]
        );
    }

    #[tokio::test]
    async fn test_first_working_reports_requested_kind() {
        let err = first_working(BackendKind::Auto, &[BackendKind::X11], |kind| async move {
            Err::<Box<dyn IdleSource>, _>(IdleError::Unavailable(format!("{kind} missing")))
        })
        .await
        .err()
        .unwrap();

        assert!(matches!(err, IdleError::NoWorkingBackend(BackendKind::Auto)));
    }
}
