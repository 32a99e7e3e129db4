//! `proof` drives proof requests and zero-knowledge proof presentations
//!
//! A verifier sends a [`request::ProofRequest`], the prover selects credentials from
//! its wallet and answers with a proof built by the crypto runtime. The verifier
//! stores the proof and verifies it against the ledger objects it references
pub mod proof;
pub mod request;
pub mod types;
pub mod usecase;

pub use proof::{ProofRecord, ProofRequestRecord};
pub use usecase::Usecase;
