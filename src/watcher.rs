//! Calibration file watching.
//!
//! Editors and sync tools tend to produce bursts of events for a single save,
//! so changes are debounced before `on_change` runs.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

/// Timing for change detection and reload.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Minimum time between callbacks (default: 2 seconds).
    pub debounce_duration: Duration,
    /// How often a suppressed change is re-checked (default: 500ms).
    pub poll_interval: Duration,
    /// Number of reload attempts (default: 3).
    pub retry_attempts: u32,
    /// Delay between reload attempts (default: 500ms).
    pub retry_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_secs(2),
            poll_interval: Duration::from_millis(500),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to create watcher: {0}")]
    Notify(#[from] notify::Error),

    #[error("calibration file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("watch channel closed unexpectedly")]
    ChannelClosed,
}

/// Collapses bursts of events into one trigger per window.
struct Debouncer {
    last_triggered: Option<Instant>,
    duration: Duration,
}

impl Debouncer {
    fn new(duration: Duration) -> Self {
        Self {
            last_triggered: None,
            duration,
        }
    }

    /// Returns true and restarts the window if the previous one has elapsed.
    fn should_trigger(&mut self, now: Instant) -> bool {
        let ready = self
            .last_triggered
            .is_none_or(|last| now.duration_since(last) >= self.duration);
        if ready {
            self.last_triggered = Some(now);
        }
        ready
    }

    /// Restarts the window without triggering.
    fn reset(&mut self, now: Instant) {
        self.last_triggered = Some(now);
    }
}

/// True for create/modify/remove events that touch the watched file name.
fn concerns_file(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

/// Watches the calibration file and calls `on_change` after each settled edit.
///
/// The parent directory is watched so that atomic save-by-rename is seen.
/// Runs until the watcher fails.
pub async fn watch_calibration<F>(
    path: impl AsRef<Path>,
    config: WatcherConfig,
    on_change: F,
) -> Result<(), WatcherError>
where
    F: Fn() + Send + 'static,
{
    let path = path.as_ref();
    let canonical = path
        .canonicalize()
        .map_err(|_| WatcherError::PathNotFound(path.to_path_buf()))?;
    let file_name = canonical
        .file_name()
        .map(|s| s.to_owned())
        .ok_or_else(|| WatcherError::PathNotFound(canonical.clone()))?;
    let watch_dir = canonical.parent().unwrap_or(&canonical).to_path_buf();

    log::info!("Watching calibration: {}", canonical.display());

    let (tx, mut rx) = mpsc::channel::<Event>(100);
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            // Full channel means a reload is already pending
            Ok(event) => {
                let _ = tx.try_send(event);
            }
            Err(e) => log::warn!("Watch error: {}", e),
        },
        notify::Config::default(),
    )?;
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let mut debouncer = Debouncer::new(config.debounce_duration);
    let mut pending = false;
    let mut poll = tokio::time::interval(config.poll_interval);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else {
                    return Err(WatcherError::ChannelClosed);
                };
                if !concerns_file(&event, &file_name) {
                    continue;
                }
                log::debug!("Calibration event: {:?}", event.kind);

                let now = Instant::now();
                if debouncer.should_trigger(now) {
                    log::info!("Calibration changed, reloading");
                    pending = false;
                    on_change();
                } else {
                    debouncer.reset(now);
                    pending = true;
                }
            }
            _ = poll.tick() => {
                if pending && debouncer.should_trigger(Instant::now()) {
                    log::info!("Calibration settled, reloading");
                    pending = false;
                    on_change();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_debouncer_first_event_triggers() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        assert!(debouncer.should_trigger(Instant::now()));
    }

    #[test]
    fn test_debouncer_blocks_burst_then_reopens() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();
        assert!(debouncer.should_trigger(start));
        assert!(!debouncer.should_trigger(start + Duration::from_millis(300)));
        assert!(debouncer.should_trigger(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_debouncer_reset_extends_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(2));
        let start = Instant::now();
        debouncer.reset(start + Duration::from_secs(1));
        assert!(!debouncer.should_trigger(start + Duration::from_secs(2)));
        assert!(debouncer.should_trigger(start + Duration::from_secs(3)));
    }

    #[test]
    fn test_concerns_file() {
        let name = OsString::from("calibration.json");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/calibration.json"));
        let other = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/tmp/notes.txt"));
        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/tmp/calibration.json"));

        assert!(concerns_file(&modify, &name));
        assert!(!concerns_file(&other, &name));
        assert!(!concerns_file(&access, &name));
    }

    #[test]
    fn test_watcher_config_default() {
        let config = WatcherConfig::default();
        assert_eq!(config.debounce_duration, Duration::from_secs(2));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = watch_calibration(dir.path().join("absent.json"), WatcherConfig::default(), || {})
            .await;
        assert!(matches!(result, Err(WatcherError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_edit_triggers_callback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, "{}").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = WatcherConfig {
            debounce_duration: Duration::from_millis(50),
            poll_interval: Duration::from_millis(20),
            ..WatcherConfig::default()
        };
        let handle = tokio::spawn(watch_calibration(path.clone(), config, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, r#"{"base_hours_per_set": 25.0}"#).unwrap();

        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        handle.abort();

        assert!(calls.load(Ordering::SeqCst) > 0);
    }
}
