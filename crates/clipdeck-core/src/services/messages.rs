//! Message types for service communication
//!
//! Commands are request-reply over oneshot channels so callers can wait
//! for an answer without blocking the panel's event loop; events fan out
//! to every subscriber through the [`EventBus`].

use std::path::PathBuf;

use super::sync::{CommitError, CommitPlan};
use super::watch::WatchError;

// ============================================================================
// Watch Commands
// ============================================================================

/// Commands sent to the DirectoryWatchService
pub enum WatchCommand {
    /// Start watching a directory; replies with its initial listing.
    /// Watching an already-watched path re-lists without adding a
    /// second watch.
    Watch {
        path: PathBuf,
        reply: tokio::sync::oneshot::Sender<Result<Vec<PathBuf>, WatchError>>,
    },

    /// Stop watching a directory (idempotent)
    Unwatch {
        path: PathBuf,
        reply: tokio::sync::oneshot::Sender<()>,
    },

    /// Get the currently watched paths
    WatchedPaths {
        reply: tokio::sync::oneshot::Sender<Vec<PathBuf>>,
    },

    /// Shutdown the service
    Shutdown,
}

// ============================================================================
// Sync Commands
// ============================================================================

/// Commands sent to the SyncService
pub enum SyncCommand {
    /// Commit a selection to the engine. The reply resolves when the
    /// whole call sequence finished or the first call failed.
    Commit {
        plan: CommitPlan,
        reply: tokio::sync::oneshot::Sender<Result<(), CommitError>>,
    },

    /// Shutdown the service. Commits already in flight run to
    /// completion; there is no cancellation.
    Shutdown,
}

// ============================================================================
// Application Events (Broadcast)
// ============================================================================

/// Events broadcast to all subscribers
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A watched directory settled after a burst of filesystem changes;
    /// `items` is the fresh sorted listing
    DirectoryChanged {
        path: PathBuf,
        items: Vec<PathBuf>,
    },

    /// A commit sequence started; the section's controls should disable
    CommitStarted {
        dir_path: PathBuf,
        input_name: String,
        item_count: usize,
    },

    /// A commit sequence finished, successfully or not; the section's
    /// controls re-enable either way
    CommitFinished {
        plan: CommitPlan,
        result: Result<(), CommitError>,
    },

    /// A commit request was refused before any remote call was issued
    /// (section already mid-commit). Distinct from `CommitFinished` so
    /// the refusal cannot re-enable a section that is still busy.
    CommitRejected {
        dir_path: PathBuf,
        error: CommitError,
    },

    // --- Service lifecycle ---
    ServiceStarted { service_name: String },
    ServiceStopped { service_name: String },
    ServiceError { service_name: String, error: String },
}

// ============================================================================
// Service Handle
// ============================================================================

/// Handle for communicating with a background service
pub struct ServiceHandle<Cmd> {
    /// Channel for sending commands to the service
    pub command_tx: crossbeam::channel::Sender<Cmd>,
    /// Thread handle for the service
    pub thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl<Cmd> ServiceHandle<Cmd> {
    /// Send a command to the service
    pub fn send(&self, cmd: Cmd) -> Result<(), crossbeam::channel::SendError<Cmd>> {
        self.command_tx.send(cmd)
    }

    /// Check if the service is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the service thread to exit
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Event bus for broadcasting events to multiple subscribers
pub struct EventBus {
    sender: crossbeam::channel::Sender<AppEvent>,
    receiver: crossbeam::channel::Receiver<AppEvent>,
}

impl EventBus {
    /// Create a new event bus with bounded capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam::channel::bounded(capacity);
        Self { sender, receiver }
    }

    /// Get a sender for publishing events
    pub fn sender(&self) -> crossbeam::channel::Sender<AppEvent> {
        self.sender.clone()
    }

    /// Get a receiver for subscribing to events
    pub fn subscribe(&self) -> crossbeam::channel::Receiver<AppEvent> {
        self.receiver.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_fan_out() {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();

        bus.sender()
            .send(AppEvent::ServiceStarted {
                service_name: "test".to_string(),
            })
            .unwrap();

        match rx.recv().unwrap() {
            AppEvent::ServiceStarted { service_name } => assert_eq!(service_name, "test"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
