//! `tails` is the filesystem tails cache of the agent
//!
//! Tails files are downloaded from the location declared by their revocation
//! registry definition into a single flat directory
pub mod cache;

pub use cache::TailsCache;
