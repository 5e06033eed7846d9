//! # stayline-sync: Front-Desk Session Services
//!
//! The asynchronous half of the front desk: commands are applied to a
//! local store at once, then persisted and announced in the background.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Desk Services                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   DeskHandle (one per clerk session)             │  │
//! │  │                                                                  │  │
//! │  │  Arc<Mutex<BookingStore>>  ← the grid renders from this          │  │
//! │  │  execute(Command) → stayline_core::apply → Applied               │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┴─────────────────────┐                  │
//! │         ▼                                           ▼                   │
//! │  ┌────────────────────────┐             ┌────────────────────────┐     │
//! │  │  Reconciler            │             │  ChannelNotifier       │     │
//! │  │                        │             │                        │     │
//! │  │  PersistBackend with   │             │  One task per channel  │     │
//! │  │  timeout + backoff     │             │  1-3s latency, 10%     │     │
//! │  │  reconcile() verdicts  │             │  simulated failures    │     │
//! │  └───────────┬────────────┘             └───────────┬────────────┘     │
//! │              │                                      │                   │
//! │              └──────────────► DeskEvent ◄───────────┘                  │
//! │                       (Persisted, Refreshed,                            │
//! │                        PersistFailure, ChannelUpdate)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`backend`] - `PersistBackend` trait and its SQLite implementation
//! - [`config`] - Desk configuration (TOML + environment)
//! - [`desk`] - `DeskHandle` session
//! - [`error`] - Error types
//! - [`event`] - Events reported to the UI
//! - [`fanout`] - Channel notifier
//! - [`reconciler`] - Persistence with timeout and retry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stayline_core::{Command, SystemClock};
//! use stayline_db::{Database, DbConfig};
//! use stayline_sync::{DeskConfig, DeskHandle};
//!
//! let config = DeskConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new(&config.database.path)).await?;
//! let (desk, mut events) = DeskHandle::start(&config, Arc::new(db), Arc::new(SystemClock)).await?;
//!
//! desk.execute(Command::CreateReservation(request)).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! ```

pub mod backend;
pub mod config;
pub mod desk;
pub mod error;
pub mod event;
pub mod fanout;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::PersistBackend;
pub use config::{DeskConfig, FanoutSettings, PersistenceSettings};
pub use desk::DeskHandle;
pub use error::{SyncError, SyncResult};
pub use event::DeskEvent;
pub use fanout::{ChannelNotifier, FailurePolicy};
pub use reconciler::{Reconciler, ReconcilerHandle};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber for hosts embedding the desk services.
///
/// `RUST_LOG` wins; otherwise `info,stayline=debug,sqlx=warn`. Calling it
/// twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stayline=debug,sqlx=warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
