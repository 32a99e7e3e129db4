use rst_common::with_logging::log::debug;

use crate::runtime::types::CryptoRuntimeBuilder;

use super::message::ContentMessage;
use super::types::{EnvelopeMessage, MessagingError};

/// `Unpacked` is the result of a successful [`Codec::unpack`]
///
/// The `sender_key` is only available when the originator authenticated the envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Unpacked {
    pub message: ContentMessage,
    pub sender_key: Option<String>,
}

/// `Codec` packs and unpacks authenticated encrypted envelopes through the crypto runtime
///
/// The codec never logs the plaintext content, only the message type uri
#[derive(Clone)]
pub struct Codec<TCrypto>
where
    TCrypto: CryptoRuntimeBuilder,
{
    crypto: TCrypto,
}

impl<TCrypto> Codec<TCrypto>
where
    TCrypto: CryptoRuntimeBuilder,
{
    pub fn new(crypto: TCrypto) -> Self {
        Self { crypto }
    }

    /// `pack` encrypts the content for the `recipient_key`
    ///
    /// When `sender_key` is given the envelope is authenticated, otherwise it is sent
    /// anonymously
    pub async fn pack(
        &self,
        content: ContentMessage,
        recipient_key: String,
        sender_key: Option<String>,
    ) -> Result<EnvelopeMessage, MessagingError> {
        if recipient_key.trim().is_empty() {
            return Err(MessagingError::EnvelopeError(
                "recipient key is missing".to_string(),
            ));
        }

        let message_type = content.message_type();
        let plaintext: Vec<u8> = content.try_into()?;

        debug!("[codec:pack] packing message type: {}", message_type);

        let ciphertext = self
            .crypto
            .pack(plaintext, recipient_key, sender_key)
            .await
            .map_err(|err| MessagingError::EnvelopeError(err.to_string()))?;

        Ok(EnvelopeMessage::new(message_type, ciphertext))
    }

    /// `unpack` decrypts the envelope with `my_key` and decodes its content
    ///
    /// Unknown message types are returned as [`ContentMessage::Unknown`], a content
    /// whose type doesn't match the envelope type is rejected
    pub async fn unpack(
        &self,
        envelope: EnvelopeMessage,
        my_key: String,
    ) -> Result<Unpacked, MessagingError> {
        let payload = self
            .crypto
            .unpack(envelope.get_content(), my_key)
            .await
            .map_err(|err| MessagingError::EnvelopeError(err.to_string()))?;

        let message = ContentMessage::try_from(payload.message)
            .map_err(|err| MessagingError::EnvelopeError(err.to_string()))?;

        if message.message_type() != envelope.get_type() {
            return Err(MessagingError::EnvelopeError(format!(
                "envelope type {} doesn't match content type {}",
                envelope.get_type(),
                message.message_type()
            )));
        }

        debug!("[codec:unpack] unpacked message type: {}", envelope.get_type());

        Ok(Unpacked {
            message,
            sender_key: payload.sender_key,
        })
    }
}
