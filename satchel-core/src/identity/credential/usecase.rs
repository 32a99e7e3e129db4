use std::collections::{HashMap, HashSet};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info, warn};

use crate::identity::connection::types::{ConnectionAPI, ConnectionEntityAccessor};
use crate::identity::connection::Connection;
use crate::messaging::envelope::Codec;
use crate::messaging::message::{
    ContentMessage, CredentialMessage, CredentialOfferMessage, CredentialRequestMessage,
};
use crate::messaging::types::RouterBuilder;
use crate::runtime::types::{CryptoRuntimeBuilder, LedgerBuilder};
use crate::tails::types::TailsBuilder;

use super::credential::CredentialIdentifiers;
use super::types::{
    CredentialAPI, CredentialEntityAccessor, CredentialError, OfferConfiguration, RepoBuilder,
    Role, State, UsecaseBuilder,
};
use super::Credential;

#[derive(Clone)]
pub struct Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Credential>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    repo: TRepo,
    connection: TConnection,
    crypto: TCrypto,
    ledger: TLedger,
    tails: TTails,
    router: TRouter,
}

impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
    Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Credential>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    pub fn new(
        repo: TRepo,
        connection: TConnection,
        crypto: TCrypto,
        ledger: TLedger,
        tails: TTails,
        router: TRouter,
    ) -> Self {
        Self {
            repo,
            connection,
            crypto,
            ledger,
            tails,
            router,
        }
    }

    fn ensure_connected(connection: Connection) -> Result<Connection, CredentialError> {
        if !connection.is_connected() {
            return Err(CredentialError::ProtocolStateError(format!(
                "connection {} is not connected, current state: {}",
                connection.get_id(),
                connection.get_state().as_str()
            )));
        }

        Ok(connection)
    }

    /// Looks up a connection by its local record id
    async fn connected(&self, id: String) -> Result<Connection, CredentialError> {
        let connection = self.connection().get_connection(id).await?;
        Self::ensure_connected(connection)
    }

    /// Looks up a connection by the protocol level id carried by inbound messages
    async fn connected_by_protocol_id(
        &self,
        connection_id: String,
    ) -> Result<Connection, CredentialError> {
        let connection = self.connection().get_by_connection_id(connection_id).await?;
        Self::ensure_connected(connection)
    }

    async fn send(
        &self,
        crypto: TCrypto,
        connection: &Connection,
        message: ContentMessage,
    ) -> Result<(), CredentialError> {
        let (my_key, their_key, endpoint) = connection.outbound()?;
        let envelope = Codec::new(crypto)
            .pack(message, their_key, Some(my_key))
            .await?;

        self.router().forward(envelope, endpoint).await?;
        Ok(())
    }

    /// Forwards the stored credential of an issued record to the holder
    async fn deliver_credential(
        &self,
        crypto: TCrypto,
        connection: &Connection,
        credential: &Credential,
    ) -> Result<(), CredentialError> {
        let credential_json = credential.get_credential_json().ok_or(
            CredentialError::ProtocolStateError("issued credential was missing".to_string()),
        )?;

        let message = CredentialMessage {
            connection_id: connection.get_connection_id(),
            thread_id: credential.get_thread_id(),
            credential_json,
        };

        self.send(crypto, connection, ContentMessage::Credential(message))
            .await
    }

    fn validate_attributes(
        schema_json: &str,
        values: &HashMap<String, String>,
    ) -> Result<(), CredentialError> {
        let schema: Value = serde_json::from_str(schema_json)
            .map_err(|err| CredentialError::JSONError(err.to_string()))?;

        let declared: HashSet<String> = schema
            .get("attrNames")
            .and_then(Value::as_array)
            .ok_or(CredentialError::ValidationError(
                "schema has no attribute names".to_string(),
            ))?
            .iter()
            .filter_map(|name| name.as_str().map(|val| val.to_string()))
            .collect();

        let given: HashSet<String> = values.keys().cloned().collect();

        let mut missing: Vec<&String> = declared.difference(&given).collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(CredentialError::ValidationError(format!(
                "missing attribute values: {:?}",
                missing
            )));
        }

        let mut unknown: Vec<&String> = given.difference(&declared).collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(CredentialError::ValidationError(format!(
                "unknown attributes: {:?}",
                unknown
            )));
        }

        Ok(())
    }
}

impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter> UsecaseBuilder<Credential>
    for Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Credential>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    type RepoImplementer = TRepo;
    type ConnectionImplementer = TConnection;
    type CryptoImplementer = TCrypto;
    type LedgerImplementer = TLedger;
    type TailsImplementer = TTails;
    type RouterImplementer = TRouter;

    fn repo(&self) -> Self::RepoImplementer {
        self.repo.clone()
    }

    fn connection(&self) -> Self::ConnectionImplementer {
        self.connection.clone()
    }

    fn crypto(&self) -> Self::CryptoImplementer {
        self.crypto.clone()
    }

    fn ledger(&self) -> Self::LedgerImplementer {
        self.ledger.clone()
    }

    fn tails(&self) -> Self::TailsImplementer {
        self.tails.clone()
    }

    fn router(&self) -> Self::RouterImplementer {
        self.router.clone()
    }
}

#[async_trait]
impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter> CredentialAPI
    for Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<EntityAccessor = Credential>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    type EntityAccessor = Credential;

    async fn send_offer(
        &self,
        connection_id: String,
        config: OfferConfiguration,
    ) -> Result<Credential, CredentialError> {
        if config.schema_id.trim().is_empty() || config.cred_def_id.trim().is_empty() {
            return Err(CredentialError::ValidationError(
                "schema_id or cred_def_id was missing".to_string(),
            ));
        }

        if config.attribute_values.is_empty() {
            return Err(CredentialError::ValidationError(
                "attribute values were missing".to_string(),
            ));
        }

        let connection = self.connected(connection_id).await?;

        let schema_json = self
            .ledger()
            .lookup_schema(config.schema_id.clone())
            .await
            .map_err(|err| CredentialError::LedgerError(err.to_string()))?
            .ok_or(CredentialError::NotFoundError(format!(
                "schema: {}",
                config.schema_id
            )))?;

        Self::validate_attributes(&schema_json, &config.attribute_values)?;

        let crypto = self.crypto();
        let offer_json = crypto
            .create_credential_offer(config.cred_def_id.clone())
            .await
            .map_err(|err| CredentialError::CryptoRuntimeError(err.to_string()))?;

        let values_json = serde_json::to_string(&config.attribute_values)
            .map_err(|err| CredentialError::JSONError(err.to_string()))?;

        let credential = Credential::offer(
            connection.get_id(),
            config.schema_id,
            config.cred_def_id,
            offer_json.clone(),
            values_json,
            config.revocation_registry_id,
        );

        let offer = CredentialOfferMessage {
            connection_id: connection.get_connection_id(),
            thread_id: credential.get_thread_id(),
            offer_json,
        };

        self.send(crypto, &connection, ContentMessage::CredentialOffer(offer))
            .await?;
        self.repo().save(&credential).await?;

        info!(
            "[credential:send_offer] offer sent: {}",
            credential.get_id()
        );

        Ok(credential)
    }

    async fn process_offer(
        &self,
        offer: CredentialOfferMessage,
    ) -> Result<Credential, CredentialError> {
        if offer.thread_id.trim().is_empty() {
            return Err(CredentialError::ValidationError(
                "offer thread_id was missing".to_string(),
            ));
        }

        let connection = self
            .connected_by_protocol_id(offer.connection_id.clone())
            .await?;

        let repo = self.repo();
        let existing = repo
            .get_by_thread_id(connection.get_id(), offer.thread_id.clone())
            .await?;

        if let Some(credential) = existing {
            debug!(
                "[credential:process_offer] offer already processed: {}",
                credential.get_id()
            );
            return Ok(credential);
        }

        let ids = CredentialIdentifiers::parse(&offer.offer_json)?;
        let credential = Credential::received(
            connection.get_id(),
            offer.thread_id,
            ids.schema_id,
            ids.cred_def_id,
            offer.offer_json,
        );

        repo.save(&credential).await?;

        info!(
            "[credential:process_offer] offer received: {}",
            credential.get_id()
        );

        Ok(credential)
    }

    async fn accept_offer(
        &self,
        credential_id: String,
        master_secret_id: String,
    ) -> Result<Credential, CredentialError> {
        if master_secret_id.trim().is_empty() {
            return Err(CredentialError::ValidationError(
                "master_secret_id was missing".to_string(),
            ));
        }

        let repo = self.repo();
        let mut credential = repo.get_by_id(credential_id).await?;
        credential.ensure(Role::Holder, State::Offered)?;

        let connection = self.connected(credential.get_connection_id()).await?;

        let cred_def_json = self
            .ledger()
            .lookup_definition(credential.get_cred_def_id())
            .await
            .map_err(|err| CredentialError::LedgerError(err.to_string()))?
            .ok_or(CredentialError::NotFoundError(format!(
                "credential definition: {}",
                credential.get_cred_def_id()
            )))?;

        let crypto = self.crypto();
        let (request_json, request_metadata_json) = crypto
            .create_credential_request(
                connection.get_my_key(),
                credential.get_offer_json(),
                cred_def_json,
                master_secret_id,
            )
            .await
            .map_err(|err| CredentialError::CryptoRuntimeError(err.to_string()))?;

        credential.set_request(request_json.clone(), Some(request_metadata_json));
        credential.transition(State::Requested)?;

        let request = CredentialRequestMessage {
            connection_id: connection.get_connection_id(),
            thread_id: credential.get_thread_id(),
            request_json,
        };

        self.send(crypto, &connection, ContentMessage::CredentialRequest(request))
            .await?;
        repo.save(&credential).await?;

        info!(
            "[credential:accept_offer] credential request sent: {}",
            credential.get_id()
        );

        Ok(credential)
    }

    async fn process_credential_request(
        &self,
        request: CredentialRequestMessage,
    ) -> Result<Credential, CredentialError> {
        let connection = self
            .connected_by_protocol_id(request.connection_id.clone())
            .await?;

        let repo = self.repo();
        let mut credential = repo.get_by_id(request.thread_id.clone()).await?;

        if credential.get_role() != Role::Issuer
            || credential.get_connection_id() != connection.get_id()
        {
            return Err(CredentialError::ProtocolStateError(format!(
                "credential {} doesn't belong to this connection",
                request.thread_id
            )));
        }

        match credential.get_state() {
            State::Offered => {}
            State::Requested
                if credential.get_request_json() == Some(request.request_json.clone()) =>
            {
                debug!(
                    "[credential:process_credential_request] request already processed: {}",
                    credential.get_id()
                );
                return Ok(credential);
            }
            state => {
                return Err(CredentialError::ProtocolStateError(format!(
                    "unexpected credential request, current state: {}",
                    state.as_str()
                )))
            }
        }

        credential.set_request(request.request_json, None);
        credential.transition(State::Requested)?;
        repo.save(&credential).await?;

        info!(
            "[credential:process_credential_request] credential requested: {}",
            credential.get_id()
        );

        Ok(credential)
    }

    async fn issue_credential(&self, credential_id: String) -> Result<Credential, CredentialError> {
        let repo = self.repo();
        let mut credential = repo.get_by_id(credential_id).await?;

        if credential.get_role() == Role::Issuer && credential.get_state() == State::Issued {
            let connection = self.connected(credential.get_connection_id()).await?;

            info!(
                "[credential:issue_credential] resending issued credential: {}",
                credential.get_id()
            );

            self.deliver_credential(self.crypto(), &connection, &credential)
                .await?;
            return Ok(credential);
        }

        credential.ensure(Role::Issuer, State::Requested)?;

        let connection = self.connected(credential.get_connection_id()).await?;

        let request_json = credential.get_request_json().ok_or(
            CredentialError::ProtocolStateError("credential request was missing".to_string()),
        )?;

        let values_json = credential.get_values_json().ok_or(
            CredentialError::ProtocolStateError("credential values were missing".to_string()),
        )?;

        let revocation_registry_id = credential.get_revocation_registry_id();
        let reader = match revocation_registry_id.clone() {
            Some(rev_reg_id) => {
                let tails = self.tails();
                let filename = tails.ensure_local(rev_reg_id).await?;
                Some(tails.open_for_read(filename).await?)
            }
            None => None,
        };

        let crypto = self.crypto();
        let issued = crypto
            .create_credential(
                credential.get_offer_json(),
                request_json,
                values_json,
                revocation_registry_id.clone(),
                reader,
            )
            .await
            .map_err(|err| CredentialError::CryptoRuntimeError(err.to_string()))?;

        match (revocation_registry_id, issued.revocation_delta_json.clone()) {
            (Some(rev_reg_id), Some(delta_json)) => {
                self.ledger()
                    .send_revocation_registry_entry(rev_reg_id, delta_json)
                    .await
                    .map_err(|err| CredentialError::LedgerError(err.to_string()))?;
            }
            (Some(rev_reg_id), None) => {
                warn!(
                    "[credential:issue_credential] no revocation delta for registry: {}",
                    rev_reg_id
                );
            }
            _ => {}
        }

        credential.set_issued(issued.credential_json, issued.revocation_id);
        credential.transition(State::Issued)?;
        repo.save(&credential).await?;

        info!(
            "[credential:issue_credential] credential issued: {}",
            credential.get_id()
        );

        self.deliver_credential(crypto, &connection, &credential)
            .await?;
        Ok(credential)
    }

    async fn store_credential(
        &self,
        message: CredentialMessage,
    ) -> Result<Credential, CredentialError> {
        let connection = self
            .connected_by_protocol_id(message.connection_id.clone())
            .await?;

        let repo = self.repo();
        let mut credential = repo
            .get_by_thread_id(connection.get_id(), message.thread_id.clone())
            .await?
            .ok_or(CredentialError::NotFoundError(format!(
                "credential thread: {}",
                message.thread_id
            )))?;

        if credential.get_role() != Role::Holder {
            return Err(CredentialError::ProtocolStateError(format!(
                "credential {} is not held by this agent",
                credential.get_id()
            )));
        }

        match credential.get_state() {
            State::Requested => {}
            State::Issued => {
                debug!(
                    "[credential:store_credential] credential already stored: {}",
                    credential.get_id()
                );
                return Ok(credential);
            }
            state => {
                return Err(CredentialError::ProtocolStateError(format!(
                    "unexpected credential, current state: {}",
                    state.as_str()
                )))
            }
        }

        let request_metadata_json = credential.get_request_metadata_json().ok_or(
            CredentialError::ProtocolStateError("credential request metadata was missing".to_string()),
        )?;

        let ids = CredentialIdentifiers::parse(&message.credential_json)?;

        let ledger = self.ledger();
        let cred_def_json = ledger
            .lookup_definition(ids.cred_def_id.clone())
            .await
            .map_err(|err| CredentialError::LedgerError(err.to_string()))?
            .ok_or(CredentialError::NotFoundError(format!(
                "credential definition: {}",
                ids.cred_def_id
            )))?;

        let rev_reg_def_json = match ids.rev_reg_id.clone() {
            Some(rev_reg_id) => Some(
                ledger
                    .lookup_revocation_registry_definition(rev_reg_id.clone())
                    .await
                    .map_err(|err| CredentialError::LedgerError(err.to_string()))?
                    .ok_or(CredentialError::NotFoundError(format!(
                        "revocation registry definition: {}",
                        rev_reg_id
                    )))?,
            ),
            None => None,
        };

        let referent = self
            .crypto()
            .store_credential(
                request_metadata_json,
                message.credential_json.clone(),
                cred_def_json,
                rev_reg_def_json,
            )
            .await
            .map_err(|err| CredentialError::CryptoRuntimeError(err.to_string()))?;

        credential.set_stored(message.credential_json, referent, ids.rev_reg_id);
        credential.transition(State::Issued)?;
        repo.save(&credential).await?;

        info!(
            "[credential:store_credential] credential stored: {}",
            credential.get_id()
        );

        Ok(credential)
    }

    async fn get_credential(&self, credential_id: String) -> Result<Credential, CredentialError> {
        self.repo().get_by_id(credential_id).await
    }

    async fn list_credentials(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Credential>, CredentialError> {
        self.repo().list_by_connection(connection_id).await
    }
}
