//! `runtime` defines the external collaborators consumed by the state machines,
//! the cryptographic agent runtime and the ledger client
pub mod types;

pub use types::{CryptoRuntimeBuilder, LedgerBuilder, RuntimeError};
