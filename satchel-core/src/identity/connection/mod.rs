//! `connection` drives the pairwise connection handshake between two agents
//!
//! The inviter creates an invitation and transmits it out-of-band, the invitee
//! accepts it and sends a connection request. The inviter answers with a connection
//! response, the invitee becomes connected and acknowledges it back so the inviter
//! becomes connected too
pub mod connection;
pub mod types;
pub mod usecase;

pub use connection::Connection;
pub use usecase::Usecase;
