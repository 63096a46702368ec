//! Request routing policy.
//!
//! The policy is split in two: an immutable [`CacheSettings`] record that
//! describes the deploy (manifest, partition names, excluded prefixes,
//! offline page), and a pure [`route`] function that classifies a request
//! without touching the network or the store.

pub mod router;
pub mod settings;

pub use router::{Bypass, Route, route};
pub use settings::CacheSettings;
