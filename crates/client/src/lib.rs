//! Worker runtime for the laojobs offline cache.
//!
//! This crate provides the network seam (reqwest fetch client), the cache
//! manager that executes the routing policy against the partition store,
//! and the registration that drives worker lifecycle transitions.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{
    ExtendableEvent, FetchOutcome, LocalHost, OfflineCacheManager, Registration, ResponseSource, WindowClient,
    WorkerHost,
};
