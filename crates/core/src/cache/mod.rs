//! SQLite-backed partitioned response cache.
//!
//! This module provides the persistent store behind the worker's named
//! cache partitions, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - Named partitions kept in creation order
//! - Request-keyed entries (SHA-256 of method and URL)
//! - Atomic batch population for install
//! - The last activated registration per scope, for resuming after restart
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod registrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::EntryInfo;
pub use partitions::{Partition, PartitionInfo};
pub use registrations::RegistrationRecord;
