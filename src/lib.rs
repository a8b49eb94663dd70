//! Cumulus - cluster coordination for managed service hosting
//!
//! One authoritative manager node and many subordinate wrapper nodes
//! invoke cluster operations through a location-transparent, promise-
//! based RPC layer: the gateway decides the execution site, the client
//! correlates outstanding queries with their eventual responses, and
//! promises let dependent operations chain without blocking callers.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod model;
pub mod node;
pub mod orchestration;
pub mod promise;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod utils;

pub use error::{ClusterError, Result};
pub use promise::Promise;
