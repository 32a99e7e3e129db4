use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_errors::thiserror::{self, Error};

pub const MESSAGE_TYPE_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";

pub const CONNECTION_INVITATION: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation";
pub const CONNECTION_REQUEST: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/request";
pub const CONNECTION_RESPONSE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/response";
pub const CONNECTION_ACKNOWLEDGE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/ack";

pub const CREDENTIAL_OFFER: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/credential/1.0/offer";
pub const CREDENTIAL_REQUEST: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/credential/1.0/request";
pub const CREDENTIAL_ISSUE: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/credential/1.0/issue";

pub const PROOF_REQUEST: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/proof/1.0/request";
pub const PROOF_PRESENTATION: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/proof/1.0/proof";

/// `MessagingError` covers every failure of the message model, the envelope codec
/// and the envelope transport
#[derive(Debug, PartialEq, Error, Clone)]
pub enum MessagingError {
    #[error("envelope error: {0}")]
    EnvelopeError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    #[error("json error: {0}")]
    JSONError(String),

    #[error("unserialize error: {0}")]
    UnserializeError(String),
}

/// `AgentEndpoint` is a peer inbox address, an HTTP uri plus the key that
/// envelopes delivered to it must be packed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct AgentEndpoint {
    pub(crate) uri: String,
    pub(crate) verkey: Option<String>,
}

impl AgentEndpoint {
    pub fn new(uri: String, verkey: Option<String>) -> Self {
        Self { uri, verkey }
    }

    pub fn get_uri(&self) -> String {
        self.uri.to_owned()
    }

    pub fn get_verkey(&self) -> Option<String> {
        self.verkey.to_owned()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct EnvelopeWire {
    #[serde(rename = "@type")]
    message_type: String,
    content: String,
}

/// `EnvelopeMessage` is the transport unit exchanged between agents
///
/// The `message_type` is the message type uri of the packed content, it is kept
/// in clear so the receiver is able to route the envelope before unpacking it.
/// The `content` is an opaque ciphertext produced by the crypto runtime
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeMessage {
    pub(crate) message_type: String,
    pub(crate) content: Vec<u8>,
}

impl EnvelopeMessage {
    pub fn new(message_type: String, content: Vec<u8>) -> Self {
        Self {
            message_type,
            content,
        }
    }

    pub fn get_type(&self) -> String {
        self.message_type.to_owned()
    }

    pub fn get_content(&self) -> Vec<u8> {
        self.content.to_owned()
    }

    /// `to_bytes` builds the opaque payload sent over the wire, a JSON object
    /// with the message type and the base64 encoded ciphertext
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessagingError> {
        let wire = EnvelopeWire {
            message_type: self.message_type.to_owned(),
            content: base64::encode(&self.content),
        };

        serde_json::to_vec(&wire).map_err(|err| MessagingError::JSONError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for EnvelopeMessage {
    type Error = MessagingError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let wire: EnvelopeWire = serde_json::from_slice(&value)
            .map_err(|err| MessagingError::UnserializeError(err.to_string()))?;

        let content = base64::decode(wire.content)
            .map_err(|err| MessagingError::EnvelopeError(err.to_string()))?;

        Ok(Self::new(wire.message_type, content))
    }
}

/// `RouterBuilder` delivers a packed envelope to a peer inbox
///
/// A single call is a single delivery attempt, implementers must not retry,
/// queue or swallow failures
#[async_trait]
pub trait RouterBuilder: Clone + Sync + Send {
    async fn forward(
        &self,
        envelope: EnvelopeMessage,
        endpoint: AgentEndpoint,
    ) -> Result<(), MessagingError>;
}
