//! Core types and shared functionality for the laojobs offline worker.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response snapshot types
//! - The request routing policy and worker lifecycle states
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod policy;
pub mod request;

pub use cache::{CacheDb, Partition};
pub use error::Error;
pub use lifecycle::WorkerState;
pub use policy::{Bypass, CacheSettings, Route, route};
pub use request::{CacheRequest, StoredResponse};
