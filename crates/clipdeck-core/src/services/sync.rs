//! SyncService - ordered commit sequences against the remote engine
//!
//! The engine's list state is mutated by relative operations (clear,
//! then add one by one), so every commit is strictly sequential: each
//! call must complete before the next is issued, and the first failure
//! aborts the remainder with no rollback of calls already sent.
//! Commits for different sections target independent inputs and may run
//! concurrently; a section with a commit in flight refuses a second one.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;

use super::messages::{AppEvent, ServiceHandle, SyncCommand};
use crate::remote::{RemoteCommand, RemoteControl, RemoteError, RemoteFunction, RemoteTarget};

const SERVICE_NAME: &str = "SyncService";

/// Errors from a commit attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// Commit requested with an empty selection
    #[error("Nothing selected")]
    EmptySelection,

    /// The section already has a commit in flight
    #[error("A commit for this section is already in flight")]
    InFlight,

    /// A remote call failed; calls before it stand, calls after it were
    /// never issued
    #[error("{function} failed: {source}")]
    Remote {
        function: RemoteFunction,
        #[source]
        source: RemoteError,
    },

    #[error("Sync service unavailable")]
    ServiceDown,
}

/// Everything one commit needs: the section identity, the engine input
/// it feeds, the policy, the items in order, and the engine address.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    /// Section key (watched directory path)
    pub dir_path: PathBuf,
    /// Engine list input receiving the items
    pub input_name: String,
    /// true: clear the remote list before adding
    pub replace: bool,
    /// Filepaths in the order they will be added
    pub items: Vec<PathBuf>,
    pub target: RemoteTarget,
}

/// Run one commit sequence to completion or first failure.
///
/// Replace mode issues `SelectIndex(input, 0)` then `ListRemoveAll`;
/// either failing aborts before any `ListAdd` (the clear's effect on the
/// engine is accepted as-is). Then one `ListAdd` per item, in order.
pub fn run_commit(remote: &dyn RemoteControl, plan: &CommitPlan) -> Result<(), CommitError> {
    if plan.items.is_empty() {
        return Err(CommitError::EmptySelection);
    }

    let input = plan.input_name.as_str();

    if plan.replace {
        invoke(remote, plan, RemoteCommand::select_index_zero(input))?;
        invoke(remote, plan, RemoteCommand::list_remove_all(input))?;
    }

    for item in &plan.items {
        invoke(remote, plan, RemoteCommand::list_add(input, &item.to_string_lossy()))?;
    }

    Ok(())
}

fn invoke(
    remote: &dyn RemoteControl,
    plan: &CommitPlan,
    command: RemoteCommand,
) -> Result<(), CommitError> {
    let function = command.function;
    remote
        .invoke(&plan.target, &command)
        .map_err(|source| CommitError::Remote { function, source })
}

/// Internal completion message from a commit worker back to the service
struct CommitDone {
    plan: CommitPlan,
    result: Result<(), CommitError>,
}

/// SyncService dispatches commit plans to short-lived worker threads,
/// one per commit, and enforces the per-section in-flight guard.
pub struct SyncService {
    command_rx: Receiver<SyncCommand>,
    event_tx: Sender<AppEvent>,
    remote: Arc<dyn RemoteControl>,
}

impl SyncService {
    /// Spawn the service in a background thread
    pub fn spawn(
        remote: Arc<dyn RemoteControl>,
        event_tx: Sender<AppEvent>,
    ) -> Result<ServiceHandle<SyncCommand>, CommitError> {
        let (command_tx, command_rx) = crossbeam::channel::unbounded();

        let service = SyncService {
            command_rx,
            event_tx: event_tx.clone(),
            remote,
        };

        let handle = thread::Builder::new()
            .name("sync-service".into())
            .spawn(move || service.run())
            .map_err(|_| CommitError::ServiceDown)?;

        let _ = event_tx.send(AppEvent::ServiceStarted {
            service_name: SERVICE_NAME.to_string(),
        });

        Ok(ServiceHandle {
            command_tx,
            thread_handle: Some(handle),
        })
    }

    fn run(self) {
        log::info!("{SERVICE_NAME} started");

        let (done_tx, done_rx) = crossbeam::channel::unbounded::<CommitDone>();
        let mut in_flight: HashSet<PathBuf> = HashSet::new();

        loop {
            crossbeam::select! {
                recv(self.command_rx) -> cmd => {
                    match cmd {
                        Ok(SyncCommand::Commit { plan, reply }) => {
                            self.start_commit(plan, reply, &mut in_flight, &done_tx);
                        }
                        Ok(SyncCommand::Shutdown) => {
                            log::info!("{SERVICE_NAME} shutting down");
                            break;
                        }
                        Err(_) => {
                            log::info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }
                recv(done_rx) -> done => {
                    if let Ok(CommitDone { plan, result }) = done {
                        in_flight.remove(&plan.dir_path);
                        let _ = self.event_tx.send(AppEvent::CommitFinished { plan, result });
                    }
                }
            }
        }

        // In-flight commits run to completion detached; there is no
        // cancellation once a sequence is issued.
        let _ = self.event_tx.send(AppEvent::ServiceStopped {
            service_name: SERVICE_NAME.to_string(),
        });

        log::info!("{SERVICE_NAME} stopped");
    }

    fn start_commit(
        &self,
        plan: CommitPlan,
        reply: tokio::sync::oneshot::Sender<Result<(), CommitError>>,
        in_flight: &mut HashSet<PathBuf>,
        done_tx: &Sender<CommitDone>,
    ) {
        if in_flight.contains(&plan.dir_path) {
            log::warn!(
                "refusing commit for {}: already in flight",
                plan.dir_path.display()
            );
            let _ = self.event_tx.send(AppEvent::CommitRejected {
                dir_path: plan.dir_path.clone(),
                error: CommitError::InFlight,
            });
            let _ = reply.send(Err(CommitError::InFlight));
            return;
        }

        in_flight.insert(plan.dir_path.clone());
        let _ = self.event_tx.send(AppEvent::CommitStarted {
            dir_path: plan.dir_path.clone(),
            input_name: plan.input_name.clone(),
            item_count: plan.items.len(),
        });

        let remote = Arc::clone(&self.remote);
        let done_tx = done_tx.clone();

        let spawned = thread::Builder::new()
            .name("sync-commit".into())
            .spawn(move || {
                let result = run_commit(remote.as_ref(), &plan);
                if let Err(e) = &result {
                    log::warn!("commit for {} failed: {e}", plan.dir_path.display());
                }
                let _ = reply.send(result.clone());
                let _ = done_tx.send(CommitDone { plan, result });
            });

        if let Err(e) = spawned {
            log::error!("failed to spawn commit worker: {e}");
            let _ = self.event_tx.send(AppEvent::ServiceError {
                service_name: SERVICE_NAME.to_string(),
                error: e.to_string(),
            });
        }
    }
}

/// Client for interacting with the SyncService
pub struct SyncClient {
    command_tx: crossbeam::channel::Sender<SyncCommand>,
}

impl SyncClient {
    pub fn new(handle: &ServiceHandle<SyncCommand>) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
        }
    }

    /// Queue a commit and return the reply channel. The result also
    /// arrives on the event bus as `CommitFinished`, so fire-and-forget
    /// callers may drop the receiver.
    pub fn request_commit(
        &self,
        plan: CommitPlan,
    ) -> Result<tokio::sync::oneshot::Receiver<Result<(), CommitError>>, CommitError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.command_tx
            .send(SyncCommand::Commit { plan, reply: tx })
            .map_err(|_| CommitError::ServiceDown)?;
        Ok(rx)
    }

    /// Commit and wait for the outcome (blocking)
    pub fn commit(&self, plan: CommitPlan) -> Result<(), CommitError> {
        let rx = self.request_commit(plan)?;
        rx.blocking_recv().map_err(|_| CommitError::ServiceDown)?
    }

    /// Shutdown the service
    pub fn shutdown(&self) -> Result<(), CommitError> {
        self.command_tx
            .send(SyncCommand::Shutdown)
            .map_err(|_| CommitError::ServiceDown)
    }
}
