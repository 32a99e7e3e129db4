//! `messaging` holds everything exchanged between two agents
//!
//! A plaintext [`ContentMessage`] is packed by the [`Codec`] into an [`EnvelopeMessage`]
//! addressed to the peer's key, and delivered by a [`types::RouterBuilder`] implementer
//! to the peer's [`AgentEndpoint`]
pub mod envelope;
pub mod message;
pub mod types;

pub use envelope::{Codec, Unpacked};
pub use message::ContentMessage;
pub use types::{AgentEndpoint, EnvelopeMessage, MessagingError};
