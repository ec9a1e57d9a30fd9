//! DirectoryWatchService - live listings for watched media folders
//!
//! Uses the `notify` crate to watch section directories. Change bursts
//! are debounced with a per-directory quiet window: every new event
//! resets that directory's timer, and only when the window elapses is
//! the directory re-listed and a `DirectoryChanged` event published.
//! A failed re-list (directory deleted mid-watch) is swallowed; the
//! watch stays registered until explicitly removed.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use super::messages::{AppEvent, ServiceHandle, WatchCommand};
use crate::listing::{read_directory, ListingError};

const SERVICE_NAME: &str = "DirectoryWatchService";

/// Errors from watch registration
#[derive(Error, Debug)]
pub enum WatchError {
    /// Directory unreadable at add time (surfaced; re-list failures
    /// during an active watch are swallowed instead)
    #[error(transparent)]
    List(#[from] ListingError),

    #[error("Failed to watch {path}: {message}")]
    Watch { path: PathBuf, message: String },

    #[error("Watch service unavailable: {0}")]
    ServiceDown(String),
}

/// Configuration for the DirectoryWatchService
#[derive(Debug, Clone)]
pub struct WatchServiceConfig {
    /// Quiet window for change bursts; only the last event in a burst
    /// triggers a re-list
    pub debounce: Duration,
}

impl Default for WatchServiceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
        }
    }
}

/// DirectoryWatchService keeps one live watch per section directory
pub struct DirectoryWatchService {
    command_rx: Receiver<WatchCommand>,
    event_tx: Sender<AppEvent>,
    config: WatchServiceConfig,
}

impl DirectoryWatchService {
    /// Spawn the service in a background thread
    pub fn spawn(
        config: WatchServiceConfig,
        event_tx: Sender<AppEvent>,
    ) -> Result<ServiceHandle<WatchCommand>, WatchError> {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();

        let service = DirectoryWatchService {
            command_rx,
            event_tx: event_tx.clone(),
            config,
        };

        let handle = thread::Builder::new()
            .name("directory-watch-service".into())
            .spawn(move || service.run())
            .map_err(|e| WatchError::ServiceDown(format!("failed to spawn thread: {e}")))?;

        let _ = event_tx.send(AppEvent::ServiceStarted {
            service_name: SERVICE_NAME.to_string(),
        });

        Ok(ServiceHandle {
            command_tx,
            thread_handle: Some(handle),
        })
    }

    /// Main service loop: commands, raw notify events, and debounce
    /// deadlines multiplexed over one select.
    fn run(self) {
        log::info!("{SERVICE_NAME} started");

        let (watcher_tx, watcher_rx) = crossbeam::channel::unbounded();

        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = watcher_tx.send(event);
                }
            }) {
                Ok(w) => w,
                Err(e) => {
                    log::error!("Failed to create file watcher: {e}");
                    let _ = self.event_tx.send(AppEvent::ServiceError {
                        service_name: SERVICE_NAME.to_string(),
                        error: e.to_string(),
                    });
                    return;
                }
            };

        // Directories with a live watch; at most one watch per path
        let mut watched: HashSet<PathBuf> = HashSet::new();
        // Pending re-list deadlines, one independent timer per directory
        let mut deadlines: BTreeMap<PathBuf, Instant> = BTreeMap::new();

        loop {
            let timer = match deadlines.values().min() {
                Some(deadline) => crossbeam::channel::at(*deadline),
                None => crossbeam::channel::never(),
            };

            crossbeam::select! {
                recv(self.command_rx) -> cmd => {
                    match cmd {
                        Ok(WatchCommand::Shutdown) => {
                            log::info!("{SERVICE_NAME} shutting down");
                            break;
                        }
                        Ok(cmd) => self.handle_command(cmd, &mut watcher, &mut watched, &mut deadlines),
                        Err(_) => {
                            log::info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }
                recv(watcher_rx) -> event => {
                    if let Ok(event) = event {
                        self.note_change(&event, &watched, &mut deadlines);
                    }
                }
                recv(timer) -> _ => {
                    self.flush_due(&mut deadlines);
                }
            }
        }

        let _ = self.event_tx.send(AppEvent::ServiceStopped {
            service_name: SERVICE_NAME.to_string(),
        });

        log::info!("{SERVICE_NAME} stopped");
    }

    fn handle_command(
        &self,
        cmd: WatchCommand,
        watcher: &mut RecommendedWatcher,
        watched: &mut HashSet<PathBuf>,
        deadlines: &mut BTreeMap<PathBuf, Instant>,
    ) {
        match cmd {
            WatchCommand::Watch { path, reply } => {
                let _ = reply.send(self.add_watch(path, watcher, watched));
            }

            WatchCommand::Unwatch { path, reply } => {
                if watched.remove(&path) {
                    if let Err(e) = watcher.unwatch(&path) {
                        // Watch may already be gone (directory deleted)
                        log::debug!("unwatch {}: {e}", path.display());
                    }
                    deadlines.remove(&path);
                    log::info!("Stopped watching: {}", path.display());
                }
                let _ = reply.send(());
            }

            WatchCommand::WatchedPaths { reply } => {
                let mut paths: Vec<PathBuf> = watched.iter().cloned().collect();
                paths.sort();
                let _ = reply.send(paths);
            }

            WatchCommand::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Register a watch and return the initial listing. Re-watching an
    /// already-watched path re-lists without creating a second watch.
    fn add_watch(
        &self,
        path: PathBuf,
        watcher: &mut RecommendedWatcher,
        watched: &mut HashSet<PathBuf>,
    ) -> Result<Vec<PathBuf>, WatchError> {
        let items = read_directory(&path)?;

        if watched.contains(&path) {
            log::debug!("Already watching {}, returning fresh listing", path.display());
            return Ok(items);
        }

        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::Watch {
                path: path.clone(),
                message: e.to_string(),
            })?;

        log::info!("Now watching: {}", path.display());
        watched.insert(path);
        Ok(items)
    }

    /// A raw filesystem event arrived: reset the debounce timer of every
    /// watched directory it touches. Nested watches both count - an
    /// event under `/media/clips` also falls under a watched `/media`.
    fn note_change(
        &self,
        event: &Event,
        watched: &HashSet<PathBuf>,
        deadlines: &mut BTreeMap<PathBuf, Instant>,
    ) {
        let deadline = Instant::now() + self.config.debounce;
        for path in &event.paths {
            for root in watched.iter().filter(|root| path.starts_with(root)) {
                deadlines.insert(root.clone(), deadline);
            }
        }
    }

    /// Re-list every directory whose quiet window elapsed and publish
    /// the result. Listing errors are swallowed - the directory is
    /// presumed transiently busy or removed.
    fn flush_due(&self, deadlines: &mut BTreeMap<PathBuf, Instant>) {
        let now = Instant::now();
        let due: Vec<PathBuf> = deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        for path in due {
            deadlines.remove(&path);
            match read_directory(&path) {
                Ok(items) => {
                    log::debug!("{} settled: {} items", path.display(), items.len());
                    let _ = self.event_tx.send(AppEvent::DirectoryChanged { path, items });
                }
                Err(e) => {
                    log::debug!("re-list of {} failed, skipping: {e}", path.display());
                }
            }
        }
    }
}

/// Client for interacting with the DirectoryWatchService
pub struct WatchClient {
    command_tx: crossbeam::channel::Sender<WatchCommand>,
}

impl WatchClient {
    pub fn new(handle: &ServiceHandle<WatchCommand>) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
        }
    }

    /// Start watching a directory and get its initial listing (blocking)
    pub fn watch(&self, path: PathBuf) -> Result<Vec<PathBuf>, WatchError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(WatchCommand::Watch { path, reply: tx })
            .map_err(|e| WatchError::ServiceDown(e.to_string()))?;

        rx.blocking_recv()
            .map_err(|e| WatchError::ServiceDown(e.to_string()))?
    }

    /// Stop watching a directory (blocking, idempotent)
    pub fn unwatch(&self, path: PathBuf) -> Result<(), WatchError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(WatchCommand::Unwatch { path, reply: tx })
            .map_err(|e| WatchError::ServiceDown(e.to_string()))?;

        rx.blocking_recv()
            .map_err(|e| WatchError::ServiceDown(e.to_string()))
    }

    /// Get the currently watched paths (blocking)
    pub fn watched_paths(&self) -> Result<Vec<PathBuf>, WatchError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(WatchCommand::WatchedPaths { reply: tx })
            .map_err(|e| WatchError::ServiceDown(e.to_string()))?;

        rx.blocking_recv()
            .map_err(|e| WatchError::ServiceDown(e.to_string()))
    }

    /// Shutdown the service
    pub fn shutdown(&self) -> Result<(), WatchError> {
        self.command_tx
            .send(WatchCommand::Shutdown)
            .map_err(|e| WatchError::ServiceDown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::messages::EventBus;
    use std::fs::File;
    use tempfile::TempDir;

    fn spawn_service(bus: &EventBus) -> (ServiceHandle<WatchCommand>, WatchClient) {
        let handle = DirectoryWatchService::spawn(WatchServiceConfig::default(), bus.sender())
            .unwrap();
        let client = WatchClient::new(&handle);
        (handle, client)
    }

    /// Drain bus events until a DirectoryChanged arrives or the timeout runs out
    fn next_directory_changed(
        rx: &crossbeam::channel::Receiver<AppEvent>,
        timeout: Duration,
    ) -> Option<(PathBuf, Vec<PathBuf>)> {
        let deadline = Instant::now() + timeout;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(remaining) {
                Ok(AppEvent::DirectoryChanged { path, items }) => return Some((path, items)),
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        None
    }

    #[test]
    fn test_service_lifecycle() {
        let bus = EventBus::new(64);
        let (mut handle, client) = spawn_service(&bus);

        assert!(client.watched_paths().unwrap().is_empty());

        client.shutdown().unwrap();
        handle.join();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_watch_returns_sorted_initial_listing() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("b.mp4")).unwrap();
        File::create(dir.path().join("a.mp4")).unwrap();
        File::create(dir.path().join("c.mp4")).unwrap();

        let bus = EventBus::new(64);
        let (mut handle, client) = spawn_service(&bus);

        let items = client.watch(dir.path().to_path_buf()).unwrap();
        let names: Vec<_> = items
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4", "c.mp4"]);

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_watch_twice_does_not_duplicate() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new(64);
        let (mut handle, client) = spawn_service(&bus);

        client.watch(dir.path().to_path_buf()).unwrap();

        // Second watch sees state added in between, no duplicate watch
        File::create(dir.path().join("late.mp4")).unwrap();
        let items = client.watch(dir.path().to_path_buf()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(client.watched_paths().unwrap().len(), 1);

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new(64);
        let (mut handle, client) = spawn_service(&bus);

        let err = client.watch(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, WatchError::List(_)));

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_unwatch_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new(64);
        let (mut handle, client) = spawn_service(&bus);

        client.watch(dir.path().to_path_buf()).unwrap();
        client.unwatch(dir.path().to_path_buf()).unwrap();
        client.unwatch(dir.path().to_path_buf()).unwrap();
        assert!(client.watched_paths().unwrap().is_empty());

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_burst_of_changes_publishes_one_listing() {
        let dir = TempDir::new().unwrap();
        let bus = EventBus::new(64);
        let events = bus.subscribe();
        let (mut handle, client) = spawn_service(&bus);

        client.watch(dir.path().to_path_buf()).unwrap();

        // Burst of creates well inside one 300ms quiet window
        File::create(dir.path().join("b.mp4")).unwrap();
        File::create(dir.path().join("a.mp4")).unwrap();
        File::create(dir.path().join("c.mp4")).unwrap();

        let (path, items) = next_directory_changed(&events, Duration::from_secs(3))
            .expect("expected a DirectoryChanged event");
        assert_eq!(path, dir.path());
        let names: Vec<_> = items
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // One re-list reflecting the state after the last event, sorted
        assert_eq!(names, vec!["a.mp4", "b.mp4", "c.mp4"]);

        // The burst must not produce a second listing
        assert!(next_directory_changed(&events, Duration::from_millis(600)).is_none());

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_nested_watches_both_get_relisted() {
        let dir = TempDir::new().unwrap();
        let outer = dir.path().to_path_buf();
        let inner = outer.join("clips");
        std::fs::create_dir(&inner).unwrap();

        let bus = EventBus::new(64);
        let events = bus.subscribe();
        let (mut handle, client) = spawn_service(&bus);

        client.watch(outer.clone()).unwrap();
        client.watch(inner.clone()).unwrap();

        // An event under the inner directory falls under both roots;
        // both timers must fire, the inner one with the new file.
        File::create(inner.join("x.mp4")).unwrap();

        let mut inner_items = None;
        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(3);
        while seen.len() < 2 {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match events.recv_timeout(remaining) {
                Ok(AppEvent::DirectoryChanged { path, items }) => {
                    if path == inner {
                        inner_items = Some(items.clone());
                    }
                    seen.push(path);
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }

        assert!(seen.contains(&outer), "outer watch never re-listed");
        assert!(seen.contains(&inner), "inner watch never re-listed");
        assert_eq!(inner_items.unwrap(), vec![inner.join("x.mp4")]);

        client.shutdown().unwrap();
        handle.join();
    }

    #[test]
    fn test_deleted_directory_is_swallowed_and_watch_stays() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("clips");
        std::fs::create_dir(&sub).unwrap();

        let bus = EventBus::new(64);
        let events = bus.subscribe();
        let (mut handle, client) = spawn_service(&bus);

        client.watch(sub.clone()).unwrap();
        std::fs::remove_dir_all(&sub).unwrap();

        // Re-list fails and is swallowed: no event, watch still registered
        assert!(next_directory_changed(&events, Duration::from_millis(800)).is_none());
        assert_eq!(client.watched_paths().unwrap(), vec![sub.clone()]);

        // Explicit removal still works after the directory is gone
        client.unwatch(sub).unwrap();
        assert!(client.watched_paths().unwrap().is_empty());

        client.shutdown().unwrap();
        handle.join();
    }
}
