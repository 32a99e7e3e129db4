//! `credential` drives the issuance of a verifiable credential over a connected connection
//!
//! The issuer sends an offer, the holder answers with a credential request built
//! from its master secret, the issuer issues the credential and the holder stores
//! it into its wallet. Both sides keep their own record, linked by the issuer's
//! record id used as the thread id
pub mod credential;
pub mod types;
pub mod usecase;

pub use credential::Credential;
pub use usecase::Usecase;
