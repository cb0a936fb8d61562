// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod catalog;
pub mod config;
pub mod metrics;
pub mod notify;
pub mod store;
pub mod watchdog;

// ---- Re-exports for stable public API ----
pub use crate::catalog::{Campaign, CatalogClient, Game};
pub use crate::notify::{Event, EventKind, Notifier, NotifierMux, Subscriber};
pub use crate::store::{JsonFileStore, MemoryStore, StateStore};
pub use crate::watchdog::{ChangeListener, ChannelListener, CycleReport, Watchdog, WatchdogEvent};
