use rst_common::with_logging::log::{debug, warn};

use satchel_core::identity::connection::types::{
    ConnectionAPI, ConnectionEntityAccessor, ConnectionError,
};
use satchel_core::identity::connection::Connection;
use satchel_core::identity::credential::types::CredentialAPI;
use satchel_core::identity::credential::Credential;
use satchel_core::identity::proof::types::ProofAPI;
use satchel_core::identity::proof::{ProofRecord, ProofRequestRecord};
use satchel_core::messaging::envelope::Codec;
use satchel_core::messaging::message::ContentMessage;
use satchel_core::messaging::{EnvelopeMessage, MessagingError};
use satchel_core::runtime::types::CryptoRuntimeBuilder;

use crate::common::types::CommonError;

/// `Dispatched` is the outcome of an inbound message, the updated record of the
/// state machine that handled it
#[derive(Debug, Clone)]
pub enum Dispatched {
    Connection(Connection),
    Credential(Credential),

    /// Local id of the prover's proof request record
    ProofRequest(String),

    /// Local id of the requester's proof record
    Proof(String),
}

/// `Dispatcher` unpacks inbound envelopes and hands their content to the owning
/// state machine
#[derive(Clone)]
pub struct Dispatcher<TConnection, TCredential, TProof, TCrypto>
where
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCredential: CredentialAPI<EntityAccessor = Credential> + Sync + Send,
    TProof: ProofAPI<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>
        + Sync
        + Send,
    TCrypto: CryptoRuntimeBuilder,
{
    connection: TConnection,
    credential: TCredential,
    proof: TProof,
    codec: Codec<TCrypto>,
}

impl<TConnection, TCredential, TProof, TCrypto> Dispatcher<TConnection, TCredential, TProof, TCrypto>
where
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCredential: CredentialAPI<EntityAccessor = Credential> + Sync + Send,
    TProof: ProofAPI<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>
        + Sync
        + Send,
    TCrypto: CryptoRuntimeBuilder,
{
    pub fn new(connection: TConnection, credential: TCredential, proof: TProof, crypto: TCrypto) -> Self {
        Self {
            connection,
            credential,
            proof,
            codec: Codec::new(crypto),
        }
    }

    /// `receive_bytes` decodes the wire payload delivered to the inbox before dispatching it
    pub async fn receive_bytes(
        &self,
        payload: Vec<u8>,
        my_key: String,
    ) -> Result<Dispatched, CommonError> {
        let envelope = EnvelopeMessage::try_from(payload)?;
        self.receive(envelope, my_key).await
    }

    /// `receive` unpacks the envelope with `my_key` and dispatches it by its message type
    ///
    /// Invitations never travel through envelopes and unknown message types are
    /// rejected, nothing is persisted for them. Every other message must be
    /// authenticated by the peer key bound to its connection
    pub async fn receive(
        &self,
        envelope: EnvelopeMessage,
        my_key: String,
    ) -> Result<Dispatched, CommonError> {
        let message_type = envelope.get_type();
        let unpacked = self.codec.unpack(envelope, my_key).await?;
        let sender_key = unpacked.sender_key;

        debug!("[dispatcher:receive] dispatching message type: {}", message_type);

        let dispatched = match unpacked.message {
            ContentMessage::ConnectionRequest(request) => {
                Self::ensure_sender(&sender_key, Some(request.key.clone()))?;
                Dispatched::Connection(self.connection.process_request(request).await?)
            }
            ContentMessage::ConnectionResponse(response) => {
                Self::ensure_sender(&sender_key, Some(response.key.clone()))?;
                Dispatched::Connection(self.connection.process_response(response).await?)
            }
            ContentMessage::ConnectionAcknowledge(ack) => {
                self.authenticate(ack.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::Connection(self.connection.process_acknowledgement(ack).await?)
            }
            ContentMessage::CredentialOffer(offer) => {
                self.authenticate(offer.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::Credential(self.credential.process_offer(offer).await?)
            }
            ContentMessage::CredentialRequest(request) => {
                self.authenticate(request.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::Credential(self.credential.process_credential_request(request).await?)
            }
            ContentMessage::Credential(credential) => {
                self.authenticate(credential.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::Credential(self.credential.store_credential(credential).await?)
            }
            ContentMessage::ProofRequest(request) => {
                self.authenticate(request.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::ProofRequest(self.proof.process_proof_request(request).await?)
            }
            ContentMessage::Proof(proof) => {
                self.authenticate(proof.connection_id.clone(), &sender_key)
                    .await?;
                Dispatched::Proof(self.proof.process_proof(proof).await?)
            }
            ContentMessage::Invitation(_) => {
                warn!("[dispatcher:receive] rejected an enveloped invitation");
                return Err(MessagingError::UnexpectedMessage(
                    "invitations are exchanged out-of-band".to_string(),
                )
                .into());
            }
            ContentMessage::Unknown(unknown) => {
                warn!("[dispatcher:receive] rejected unknown message type: {}", unknown);
                return Err(MessagingError::UnknownMessageType(unknown).into());
            }
        };

        Ok(dispatched)
    }

    /// `authenticate` checks the envelope was sent by the peer of the referenced connection
    async fn authenticate(
        &self,
        connection_id: String,
        sender_key: &Option<String>,
    ) -> Result<(), CommonError> {
        let connection = self.connection.get_by_connection_id(connection_id).await?;
        Self::ensure_sender(sender_key, connection.get_their_key())
            .map_err(|err| {
                warn!(
                    "[dispatcher:authenticate] rejected envelope for connection: {}",
                    connection.get_id()
                );
                err
            })?;

        Ok(())
    }

    fn ensure_sender(
        sender_key: &Option<String>,
        expected_key: Option<String>,
    ) -> Result<(), ConnectionError> {
        match (sender_key, expected_key) {
            (None, _) => Err(ConnectionError::ProtocolStateError(
                "anonymous envelope was rejected".to_string(),
            )),
            (Some(sender), Some(expected)) if *sender == expected => Ok(()),
            _ => Err(ConnectionError::ProtocolStateError(
                "envelope sender doesn't match the connection peer".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::Arc;

    use rst_common::standard::async_trait::async_trait;
    use rst_common::standard::serde_json::{self, json};
    use rst_common::with_tokio::tokio;

    use satchel_core::identity::connection::types::{
        ConnectionError, InviteConfiguration, State as ConnectionState,
    };
    use satchel_core::identity::credential::types::{CredentialError, OfferConfiguration};
    use satchel_core::identity::proof::request::{ProofRequest, RequestedCredentials};
    use satchel_core::identity::proof::types::ProofError;
    use satchel_core::messaging::message::{
        ConnectionAcknowledgeMessage, ConnectionRequestMessage, ConnectionResponseMessage,
        CredentialMessage, CredentialOfferMessage, CredentialRequestMessage, InvitationMessage,
        ProofMessage, ProofRequestMessage,
    };
    use satchel_core::messaging::types::{
        CONNECTION_INVITATION, CONNECTION_REQUEST, CONNECTION_RESPONSE, CREDENTIAL_OFFER, MESSAGE_TYPE_PREFIX,
        PROOF_PRESENTATION,
    };
    use satchel_core::runtime::types::{
        CredentialInfo, IssuedCredential, RuntimeError, UnpackedPayload,
    };
    use satchel_core::tails::TailsReader;

    mock!(
        FakeConnection{}

        impl Clone for FakeConnection {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl ConnectionAPI for FakeConnection {
            type EntityAccessor = Connection;

            async fn create_invitation(&self, config: InviteConfiguration) -> Result<(Connection, InvitationMessage), ConnectionError>;
            async fn accept_invitation(&self, invitation: InvitationMessage) -> Result<Connection, ConnectionError>;
            async fn process_request(&self, request: ConnectionRequestMessage) -> Result<Connection, ConnectionError>;
            async fn process_response(&self, response: ConnectionResponseMessage) -> Result<Connection, ConnectionError>;
            async fn process_acknowledgement(&self, ack: ConnectionAcknowledgeMessage) -> Result<Connection, ConnectionError>;
            async fn get_connection(&self, id: String) -> Result<Connection, ConnectionError>;
            async fn get_by_connection_id(&self, connection_id: String) -> Result<Connection, ConnectionError>;
            async fn list_connections(&self, state: Option<ConnectionState>) -> Result<Vec<Connection>, ConnectionError>;
        }
    );

    mock!(
        FakeCredential{}

        impl Clone for FakeCredential {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl CredentialAPI for FakeCredential {
            type EntityAccessor = Credential;

            async fn send_offer(&self, connection_id: String, config: OfferConfiguration) -> Result<Credential, CredentialError>;
            async fn process_offer(&self, offer: CredentialOfferMessage) -> Result<Credential, CredentialError>;
            async fn accept_offer(&self, credential_id: String, master_secret_id: String) -> Result<Credential, CredentialError>;
            async fn process_credential_request(&self, request: CredentialRequestMessage) -> Result<Credential, CredentialError>;
            async fn issue_credential(&self, credential_id: String) -> Result<Credential, CredentialError>;
            async fn store_credential(&self, credential: CredentialMessage) -> Result<Credential, CredentialError>;
            async fn get_credential(&self, credential_id: String) -> Result<Credential, CredentialError>;
            async fn list_credentials(&self, connection_id: Option<String>) -> Result<Vec<Credential>, CredentialError>;
        }
    );

    mock!(
        FakeProof{}

        impl Clone for FakeProof {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl ProofAPI for FakeProof {
            type RequestEntityAccessor = ProofRequestRecord;
            type ProofEntityAccessor = ProofRecord;

            async fn send_proof_request(&self, connection_id: String, request: ProofRequest) -> Result<ProofRequestRecord, ProofError>;
            async fn process_proof_request(&self, message: ProofRequestMessage) -> Result<String, ProofError>;
            async fn list_credentials_for_request(&self, request: ProofRequest, referent: String) -> Result<Vec<CredentialInfo>, ProofError>;
            async fn accept_proof_request(&self, request_id: String, requested: RequestedCredentials) -> Result<ProofRequestRecord, ProofError>;
            async fn reject_proof_request(&self, request_id: String) -> Result<ProofRequestRecord, ProofError>;
            async fn process_proof(&self, message: ProofMessage) -> Result<String, ProofError>;
            async fn verify_proof(&self, proof_id: String) -> Result<bool, ProofError>;
            async fn get_proof_request(&self, request_id: String) -> Result<ProofRequestRecord, ProofError>;
            async fn get_proof(&self, proof_id: String) -> Result<ProofRecord, ProofError>;
            async fn list_proof_requests(&self, connection_id: Option<String>) -> Result<Vec<ProofRequestRecord>, ProofError>;
        }
    );

    mock!(
        FakeCrypto{}

        impl Clone for FakeCrypto {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl CryptoRuntimeBuilder for FakeCrypto {
            async fn create_key(&self) -> Result<String, RuntimeError>;
            async fn pack(&self, message: Vec<u8>, recipient_key: String, sender_key: Option<String>) -> Result<Vec<u8>, RuntimeError>;
            async fn unpack(&self, ciphertext: Vec<u8>, my_key: String) -> Result<UnpackedPayload, RuntimeError>;
            async fn create_credential_offer(&self, cred_def_id: String) -> Result<String, RuntimeError>;
            async fn create_credential_request(&self, prover_key: String, offer_json: String, cred_def_json: String, master_secret_id: String) -> Result<(String, String), RuntimeError>;
            async fn create_credential(&self, offer_json: String, request_json: String, values_json: String, rev_reg_id: Option<String>, tails: Option<Arc<TailsReader>>) -> Result<IssuedCredential, RuntimeError>;
            async fn store_credential(&self, request_metadata_json: String, credential_json: String, cred_def_json: String, rev_reg_def_json: Option<String>) -> Result<String, RuntimeError>;
            async fn search_credentials_for_proof_request(&self, request_json: String, referent: String) -> Result<Vec<CredentialInfo>, RuntimeError>;
            async fn get_credential(&self, credential_id: String) -> Result<CredentialInfo, RuntimeError>;
            async fn create_revocation_state(&self, tails: Arc<TailsReader>, rev_reg_def_json: String, rev_reg_delta_json: String, timestamp: u64, cred_rev_id: String) -> Result<String, RuntimeError>;
            async fn create_proof(&self, request_json: String, requested_credentials_json: String, master_secret_id: String, schemas_json: String, cred_defs_json: String, rev_states_json: String) -> Result<String, RuntimeError>;
            async fn verify_proof(&self, request_json: String, proof_json: String, schemas_json: String, cred_defs_json: String, rev_reg_defs_json: String, rev_regs_json: String) -> Result<bool, RuntimeError>;
        }
    );

    type FakeDispatcher = Dispatcher<MockFakeConnection, MockFakeCredential, MockFakeProof, MockFakeCrypto>;

    /// The fake runtime "decrypts" by handing back the plaintext it was given
    fn crypto_unpacking(plaintext: serde_json::Value) -> MockFakeCrypto {
        crypto_unpacking_from(plaintext, Some("their-key"))
    }

    fn crypto_unpacking_from(plaintext: serde_json::Value, sender: Option<&str>) -> MockFakeCrypto {
        let sender_key = sender.map(|key| key.to_string());
        let mut crypto = MockFakeCrypto::new();
        crypto
            .expect_unpack()
            .with(eq(b"ciphertext".to_vec()), eq("my-key".to_string()))
            .times(1)
            .return_once(move |_, _| {
                Ok(UnpackedPayload {
                    message: serde_json::to_vec(&plaintext).unwrap(),
                    sender_key,
                })
            });

        crypto
    }

    fn connection_with_peer() -> MockFakeConnection {
        let mut connection = MockFakeConnection::new();
        connection
            .expect_get_by_connection_id()
            .with(eq("conn-1".to_string()))
            .times(1)
            .returning(|connection_id| {
                let mut connection = Connection::new(
                    connection_id,
                    "my-key".to_string(),
                    ConnectionState::Connected,
                );
                connection.set_peer("their-key".to_string(), "http://peer/inbox".to_string());
                Ok(connection)
            });

        connection
    }

    fn offer_plaintext() -> serde_json::Value {
        json!({
            "@type": CREDENTIAL_OFFER,
            "connectionId": "conn-1",
            "threadId": "thread-1",
            "offerJson": "{}",
        })
    }

    fn generate_dispatcher(
        connection: MockFakeConnection,
        credential: MockFakeCredential,
        proof: MockFakeProof,
        crypto: MockFakeCrypto,
    ) -> FakeDispatcher {
        Dispatcher::new(connection, credential, proof, crypto)
    }

    fn envelope(message_type: &str) -> EnvelopeMessage {
        EnvelopeMessage::new(message_type.to_string(), b"ciphertext".to_vec())
    }

    #[tokio::test]
    async fn test_dispatch_connection_request() {
        let plaintext = json!({
            "@type": CONNECTION_REQUEST,
            "connectionId": "conn-1",
            "key": "their-key",
            "endpoint": "http://peer/inbox",
        });

        let mut connection = MockFakeConnection::new();
        connection
            .expect_process_request()
            .times(1)
            .returning(|request| {
                assert_eq!(request.connection_id, "conn-1".to_string());
                Ok(Connection::new(
                    request.connection_id,
                    "my-key".to_string(),
                    ConnectionState::Negotiating,
                ))
            });

        let dispatcher = generate_dispatcher(
            connection,
            MockFakeCredential::new(),
            MockFakeProof::new(),
            crypto_unpacking(plaintext),
        );

        let dispatched = dispatcher
            .receive(envelope(CONNECTION_REQUEST), "my-key".to_string())
            .await;
        assert!(matches!(dispatched.unwrap(), Dispatched::Connection(_)))
    }

    #[tokio::test]
    async fn test_dispatch_credential_offer_error() {
        let plaintext = offer_plaintext();

        let mut credential = MockFakeCredential::new();
        credential
            .expect_process_offer()
            .times(1)
            .returning(|_| {
                Err(CredentialError::ProtocolStateError(
                    "connection conn-1 is not connected".to_string(),
                ))
            });

        let dispatcher = generate_dispatcher(
            connection_with_peer(),
            credential,
            MockFakeProof::new(),
            crypto_unpacking(plaintext),
        );

        let dispatched = dispatcher
            .receive(envelope(CREDENTIAL_OFFER), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::CredentialError(CredentialError::ProtocolStateError(_))
        ))
    }

    #[tokio::test]
    async fn test_dispatch_proof() {
        let plaintext = json!({
            "@type": PROOF_PRESENTATION,
            "connectionId": "conn-1",
            "threadId": "thread-1",
            "content": "{}",
        });

        let mut proof = MockFakeProof::new();
        proof
            .expect_process_proof()
            .times(1)
            .returning(|_| Ok("proof-1".to_string()));

        let dispatcher = generate_dispatcher(
            connection_with_peer(),
            MockFakeCredential::new(),
            proof,
            crypto_unpacking(plaintext),
        );

        let dispatched = dispatcher
            .receive_bytes(
                envelope(PROOF_PRESENTATION).to_bytes().unwrap(),
                "my-key".to_string(),
            )
            .await;
        assert!(matches!(dispatched.unwrap(), Dispatched::Proof(id) if id == "proof-1"))
    }

    #[tokio::test]
    async fn test_reject_foreign_sender() {
        let mut credential = MockFakeCredential::new();
        credential.expect_process_offer().times(0);

        let dispatcher = generate_dispatcher(
            connection_with_peer(),
            credential,
            MockFakeProof::new(),
            crypto_unpacking_from(offer_plaintext(), Some("mallory-key")),
        );

        let dispatched = dispatcher
            .receive(envelope(CREDENTIAL_OFFER), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::ConnectionError(ConnectionError::ProtocolStateError(_))
        ))
    }

    #[tokio::test]
    async fn test_reject_anonymous_sender() {
        let plaintext = json!({
            "@type": PROOF_PRESENTATION,
            "connectionId": "conn-1",
            "threadId": "thread-1",
            "content": "{}",
        });

        let mut proof = MockFakeProof::new();
        proof.expect_process_proof().times(0);

        let dispatcher = generate_dispatcher(
            MockFakeConnection::new(),
            MockFakeCredential::new(),
            proof,
            crypto_unpacking_from(plaintext, None),
        );

        let dispatched = dispatcher
            .receive(envelope(PROOF_PRESENTATION), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::ConnectionError(ConnectionError::ProtocolStateError(_))
        ))
    }

    #[tokio::test]
    async fn test_reject_response_signed_by_another_key() {
        let plaintext = json!({
            "@type": CONNECTION_RESPONSE,
            "connectionId": "conn-1",
            "key": "their-key",
            "endpoint": "http://mallory/inbox",
        });

        let mut connection = MockFakeConnection::new();
        connection.expect_process_response().times(0);

        let dispatcher = generate_dispatcher(
            connection,
            MockFakeCredential::new(),
            MockFakeProof::new(),
            crypto_unpacking_from(plaintext, Some("mallory-key")),
        );

        let dispatched = dispatcher
            .receive(envelope(CONNECTION_RESPONSE), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::ConnectionError(ConnectionError::ProtocolStateError(_))
        ))
    }

    #[tokio::test]
    async fn test_reject_enveloped_invitation() {
        let plaintext = json!({
            "@type": CONNECTION_INVITATION,
            "endpoint": "http://peer/inbox",
            "connectionKey": "their-key",
            "connectionId": "conn-1",
        });

        let dispatcher = generate_dispatcher(
            MockFakeConnection::new(),
            MockFakeCredential::new(),
            MockFakeProof::new(),
            crypto_unpacking(plaintext),
        );

        let dispatched = dispatcher
            .receive(envelope(CONNECTION_INVITATION), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::MessagingError(MessagingError::UnexpectedMessage(_))
        ))
    }

    #[tokio::test]
    async fn test_reject_unknown_message_type() {
        let unknown = format!("{}basicmessage/1.0/message", MESSAGE_TYPE_PREFIX);
        let plaintext = json!({
            "@type": unknown.clone(),
            "content": "hello",
        });

        let dispatcher = generate_dispatcher(
            MockFakeConnection::new(),
            MockFakeCredential::new(),
            MockFakeProof::new(),
            crypto_unpacking(plaintext),
        );

        let dispatched = dispatcher
            .receive(envelope(&unknown), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::MessagingError(MessagingError::UnknownMessageType(message_type)) if message_type == unknown
        ))
    }

    #[tokio::test]
    async fn test_reject_invalid_payload() {
        let dispatcher = generate_dispatcher(
            MockFakeConnection::new(),
            MockFakeCredential::new(),
            MockFakeProof::new(),
            MockFakeCrypto::new(),
        );

        let dispatched = dispatcher
            .receive_bytes(b"not-an-envelope".to_vec(), "my-key".to_string())
            .await;
        assert!(matches!(
            dispatched.unwrap_err(),
            CommonError::MessagingError(MessagingError::UnserializeError(_))
        ))
    }
}
