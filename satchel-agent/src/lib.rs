//! `satchel-agent` provides the concrete adapters of the satchel agent
//!
//! - `router`, envelope delivery over HTTP
//! - `tails`, the filesystem tails cache with single-flight downloads
//! - `storage`, the RocksDB wallet record store and the domain repositories
//! - `config`, the TOML configuration
//! - `dispatcher`, the inbound envelope dispatch to the state machines
//!
//! [`Agent`] assembles all of them on top of `satchel-core`
pub mod agent;
pub mod common;
pub mod config;
pub mod dispatcher;
pub mod router;
pub mod storage;
pub mod tails;

pub use agent::Agent;
pub use config::{Config, Parser as ConfigParser};
pub use dispatcher::{Dispatched, Dispatcher};
pub use router::HttpRouter;
pub use tails::TailsCache;
