use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};

use super::types::*;

/// `InvitationMessage` is the out-of-band payload created by the inviter
///
/// It is never sent through the envelope transport since the invitee has no
/// shared key with the inviter yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct InvitationMessage {
    pub endpoint: String,
    #[serde(rename = "connectionKey")]
    pub connection_key: String,
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionRequestMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    pub key: String,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionResponseMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    pub key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ConnectionAcknowledgeMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
}

/// The `thread_id` of every credential message is the issuer's record id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialOfferMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    #[serde(rename = "offerJson")]
    pub offer_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialRequestMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    #[serde(rename = "requestJson")]
    pub request_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    #[serde(rename = "credentialJson")]
    pub credential_json: String,
}

/// The `thread_id` of every proof message is the requester's record id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRequestMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    #[serde(rename = "requestJson")]
    pub request_json: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofMessage {
    #[serde(rename = "connectionId")]
    pub connection_id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub content: String,
}

/// `ContentMessage` is the decrypted logical message
///
/// Its JSON form is a flat object tagged by the `@type` field. Types this agent
/// doesn't know are decoded into [`ContentMessage::Unknown`] so the caller is able
/// to reject them explicitly
#[derive(Debug, Clone, PartialEq)]
pub enum ContentMessage {
    Invitation(InvitationMessage),
    ConnectionRequest(ConnectionRequestMessage),
    ConnectionResponse(ConnectionResponseMessage),
    ConnectionAcknowledge(ConnectionAcknowledgeMessage),
    CredentialOffer(CredentialOfferMessage),
    CredentialRequest(CredentialRequestMessage),
    Credential(CredentialMessage),
    ProofRequest(ProofRequestMessage),
    Proof(ProofMessage),
    Unknown(String),
}

impl ContentMessage {
    pub fn message_type(&self) -> String {
        let message_type = match self {
            ContentMessage::Invitation(_) => CONNECTION_INVITATION,
            ContentMessage::ConnectionRequest(_) => CONNECTION_REQUEST,
            ContentMessage::ConnectionResponse(_) => CONNECTION_RESPONSE,
            ContentMessage::ConnectionAcknowledge(_) => CONNECTION_ACKNOWLEDGE,
            ContentMessage::CredentialOffer(_) => CREDENTIAL_OFFER,
            ContentMessage::CredentialRequest(_) => CREDENTIAL_REQUEST,
            ContentMessage::Credential(_) => CREDENTIAL_ISSUE,
            ContentMessage::ProofRequest(_) => PROOF_REQUEST,
            ContentMessage::Proof(_) => PROOF_PRESENTATION,
            ContentMessage::Unknown(message_type) => message_type.as_str(),
        };

        message_type.to_string()
    }

    pub fn to_value(&self) -> Result<Value, MessagingError> {
        let payload = match self {
            ContentMessage::Invitation(msg) => serde_json::to_value(msg),
            ContentMessage::ConnectionRequest(msg) => serde_json::to_value(msg),
            ContentMessage::ConnectionResponse(msg) => serde_json::to_value(msg),
            ContentMessage::ConnectionAcknowledge(msg) => serde_json::to_value(msg),
            ContentMessage::CredentialOffer(msg) => serde_json::to_value(msg),
            ContentMessage::CredentialRequest(msg) => serde_json::to_value(msg),
            ContentMessage::Credential(msg) => serde_json::to_value(msg),
            ContentMessage::ProofRequest(msg) => serde_json::to_value(msg),
            ContentMessage::Proof(msg) => serde_json::to_value(msg),
            ContentMessage::Unknown(message_type) => {
                return Err(MessagingError::UnknownMessageType(message_type.to_owned()))
            }
        }
        .map_err(|err| MessagingError::JSONError(err.to_string()))?;

        let mut value = payload;
        match value.as_object_mut() {
            Some(fields) => {
                fields.insert("@type".to_string(), Value::String(self.message_type()));
            }
            None => {
                return Err(MessagingError::JSONError(
                    "message payload is not an object".to_string(),
                ))
            }
        }

        Ok(value)
    }

    pub fn from_value(value: Value) -> Result<Self, MessagingError> {
        let message_type = value
            .get("@type")
            .and_then(Value::as_str)
            .map(|val| val.to_string())
            .ok_or(MessagingError::UnserializeError(
                "missing @type".to_string(),
            ))?;

        let message = match message_type.as_str() {
            CONNECTION_INVITATION => ContentMessage::Invitation(decode(value)?),
            CONNECTION_REQUEST => ContentMessage::ConnectionRequest(decode(value)?),
            CONNECTION_RESPONSE => ContentMessage::ConnectionResponse(decode(value)?),
            CONNECTION_ACKNOWLEDGE => ContentMessage::ConnectionAcknowledge(decode(value)?),
            CREDENTIAL_OFFER => ContentMessage::CredentialOffer(decode(value)?),
            CREDENTIAL_REQUEST => ContentMessage::CredentialRequest(decode(value)?),
            CREDENTIAL_ISSUE => ContentMessage::Credential(decode(value)?),
            PROOF_REQUEST => ContentMessage::ProofRequest(decode(value)?),
            PROOF_PRESENTATION => ContentMessage::Proof(decode(value)?),
            _ => ContentMessage::Unknown(message_type),
        };

        Ok(message)
    }
}

fn decode<T>(value: Value) -> Result<T, MessagingError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|err| MessagingError::UnserializeError(err.to_string()))
}

impl TryInto<Vec<u8>> for ContentMessage {
    type Error = MessagingError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let value = self.to_value()?;
        serde_json::to_vec(&value).map_err(|err| MessagingError::JSONError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for ContentMessage {
    type Error = MessagingError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let json: Value = serde_json::from_slice(&value)
            .map_err(|err| MessagingError::UnserializeError(err.to_string()))?;

        ContentMessage::from_value(json)
    }
}
