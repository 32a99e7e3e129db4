//! `satchel-core` holds the protocol orchestration layer of the satchel agent
//!
//! The crate is split into these domains:
//!
//! - `messaging`, the logical content messages, the encrypted envelope and its codec,
//!   and the router abstraction used to deliver envelopes to peers
//! - `runtime`, the abstractions of the external cryptographic agent runtime and
//!   the ledger client
//! - `tails`, read and write handles over revocation tails files and the tails
//!   cache abstraction
//! - `identity`, the connection, credential and proof state machines
//!
//! This crate never performs any network or storage calls by itself. Every
//! external capability is consumed through a trait, the concrete adapters live
//! at `satchel-agent`
pub mod identity;
pub mod messaging;
pub mod runtime;
pub mod tails;
