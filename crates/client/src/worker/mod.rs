//! The offline cache worker.
//!
//! ### Events
//! - `install`: populate the static partition from the manifest, all or nothing.
//! - `activate`: delete partitions from earlier versions, claim open clients.
//! - `fetch`: route the request and run network-first or cache-first.
//! - `push` / `notificationclick`: show and act on job notifications.
//! - `sync`: background-sync extension point.
//!
//! ### Lifetimes
//! Lifecycle handlers are awaited by the registration. Work a fetch handler
//! must finish after the response is returned (cache writes) is attached to
//! an [`ExtendableEvent`] which the host awaits separately.

pub mod event;
pub mod host;
pub mod manager;
pub mod push;
pub mod registration;
pub mod sync;

pub use event::ExtendableEvent;
pub use host::{LocalHost, WindowClient, WorkerHost};
pub use manager::{FetchOutcome, OfflineCacheManager, ResponseSource};
pub use push::{ClickDecision, Notification, PushPayload};
pub use registration::{Registration, RegistrationStatus, UpdateOutcome};
