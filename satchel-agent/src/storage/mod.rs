//! `storage` is the wallet record store of the agent
//!
//! Records are opaque bytes addressed by their record type and id, and indexed
//! by plain string tags. Every domain repository lives on top of a single shared
//! [`Store`] backed by RocksDB, opened through [`Builder`] from the `[db]`
//! configuration section
pub mod builder;
pub mod connection;
pub mod credential;
pub mod proof;
pub mod store;
pub mod types;

pub use builder::Builder;
pub use store::Store;
pub use types::{Instruction, OutputOpts, StoreError};
