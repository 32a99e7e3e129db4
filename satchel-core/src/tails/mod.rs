//! `tails` provides handles over revocation tails files
//!
//! A tails file is an immutable binary blob referenced by a revocation registry
//! definition on the ledger. The files live flat in a single local directory,
//! named after the last path segment of their declared location
pub mod reader;
pub mod types;
pub mod writer;

pub use reader::TailsReader;
pub use types::{TailsBuilder, TailsError};
pub use writer::TailsWriter;
