//! Background services for clipdeck-core
//!
//! Message-driven services running in background threads, keeping the
//! panel's event loop free. Commands are request-reply over oneshot
//! channels; state changes are broadcast on the event bus.
//!
//! ```text
//! ┌─────────────┐     Commands      ┌───────────────────────┐
//! │ Panel loop  │ ───────────────►  │ DirectoryWatchService │
//! │             │ ◄──────────────── │       (notify)        │
//! └─────────────┘     Replies       └───────────────────────┘
//!       │                                      │
//!       │ Subscribe                            │ Publish
//!       ▼                                      ▼
//! ┌──────────────────────────────────────────────────┐
//! │                    Event Bus                     │
//! └──────────────────────────────────────────────────┘
//!                        ▲
//!                        │ Publish
//!                 ┌─────────────┐
//!                 │ SyncService │
//!                 │ (vMix HTTP) │
//!                 └─────────────┘
//! ```

pub mod messages;
pub mod sync;
pub mod watch;

pub use messages::{AppEvent, EventBus, ServiceHandle, SyncCommand, WatchCommand};
pub use sync::{run_commit, CommitError, CommitPlan, SyncClient, SyncService};
pub use watch::{DirectoryWatchService, WatchClient, WatchError, WatchServiceConfig};
