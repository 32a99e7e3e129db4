//! `identity` holds the three protocol state machines of an agent
pub mod connection;
pub mod credential;
pub mod proof;
