use std::collections::HashMap;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::Serialize;
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info};

use crate::identity::connection::types::{ConnectionAPI, ConnectionEntityAccessor};
use crate::identity::connection::Connection;
use crate::messaging::envelope::Codec;
use crate::messaging::message::{ContentMessage, ProofMessage, ProofRequestMessage};
use crate::messaging::types::RouterBuilder;
use crate::runtime::types::{CredentialInfo, CryptoRuntimeBuilder, LedgerBuilder};
use crate::tails::types::TailsBuilder;

use super::proof::{ProofRecord, ProofRequestRecord};
use super::request::{ProofRequest, RequestedCredentials};
use super::types::{
    ProofAPI, ProofEntityAccessor, ProofError, ProofRequestEntityAccessor, ProofState,
    RepoBuilder, RequestState, Role, UsecaseBuilder,
};

type LedgerObjects = HashMap<String, Value>;
type TimedLedgerObjects = HashMap<String, HashMap<String, Value>>;

fn parse_json(json: &str) -> Result<Value, ProofError> {
    serde_json::from_str(json).map_err(|err| ProofError::JSONError(err.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ProofError> {
    serde_json::to_string(value).map_err(|err| ProofError::JSONError(err.to_string()))
}

#[derive(Clone)]
pub struct Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>,
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
    master_secret_id: String,
}

impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
    Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    /// `master_secret_id` is the prover's wallet master secret used to build every proof
    pub fn new(
        repo: TRepo,
        connection: TConnection,
        crypto: TCrypto,
        ledger: TLedger,
        tails: TTails,
        router: TRouter,
        master_secret_id: String,
    ) -> Self {
        Self {
            repo,
            connection,
            crypto,
            ledger,
            tails,
            router,
            master_secret_id,
        }
    }

    fn ensure_connected(connection: Connection) -> Result<Connection, ProofError> {
        if !connection.is_connected() {
            return Err(ProofError::ProtocolStateError(format!(
                "connection {} is not connected, current state: {}",
                connection.get_id(),
                connection.get_state().as_str()
            )));
        }

        Ok(connection)
    }

    async fn connected(&self, id: String) -> Result<Connection, ProofError> {
        let connection = self.connection().get_connection(id).await?;
        Self::ensure_connected(connection)
    }

    async fn connected_by_protocol_id(&self, connection_id: String) -> Result<Connection, ProofError> {
        let connection = self.connection().get_by_connection_id(connection_id).await?;
        Self::ensure_connected(connection)
    }

    async fn send(
        &self,
        crypto: TCrypto,
        connection: &Connection,
        message: ContentMessage,
    ) -> Result<(), ProofError> {
        let (my_key, their_key, endpoint) = connection.outbound()?;
        let envelope = Codec::new(crypto)
            .pack(message, their_key, Some(my_key))
            .await?;

        self.router().forward(envelope, endpoint).await?;
        Ok(())
    }

    async fn resolve_schema(
        ledger: &TLedger,
        schemas: &mut LedgerObjects,
        schema_id: String,
    ) -> Result<(), ProofError> {
        if schemas.contains_key(&schema_id) {
            return Ok(());
        }

        let schema_json = ledger
            .lookup_schema(schema_id.clone())
            .await
            .map_err(|err| ProofError::LedgerError(err.to_string()))?
            .ok_or(ProofError::NotFoundError(format!("schema: {}", schema_id)))?;

        schemas.insert(schema_id, parse_json(&schema_json)?);
        Ok(())
    }

    async fn resolve_definition(
        ledger: &TLedger,
        cred_defs: &mut LedgerObjects,
        cred_def_id: String,
    ) -> Result<(), ProofError> {
        if cred_defs.contains_key(&cred_def_id) {
            return Ok(());
        }

        let cred_def_json = ledger
            .lookup_definition(cred_def_id.clone())
            .await
            .map_err(|err| ProofError::LedgerError(err.to_string()))?
            .ok_or(ProofError::NotFoundError(format!(
                "credential definition: {}",
                cred_def_id
            )))?;

        cred_defs.insert(cred_def_id, parse_json(&cred_def_json)?);
        Ok(())
    }

    async fn resolve_registry_definition(
        ledger: &TLedger,
        rev_reg_id: String,
    ) -> Result<String, ProofError> {
        ledger
            .lookup_revocation_registry_definition(rev_reg_id.clone())
            .await
            .map_err(|err| ProofError::LedgerError(err.to_string()))?
            .ok_or(ProofError::NotFoundError(format!(
                "revocation registry definition: {}",
                rev_reg_id
            )))
    }
}

impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
    UsecaseBuilder<ProofRequestRecord, ProofRecord>
    for Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>,
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
impl<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter> ProofAPI
    for Usecase<TRepo, TConnection, TCrypto, TLedger, TTails, TRouter>
where
    TRepo: RepoBuilder<RequestEntityAccessor = ProofRequestRecord, ProofEntityAccessor = ProofRecord>,
    TConnection: ConnectionAPI<EntityAccessor = Connection> + Sync + Send,
    TCrypto: CryptoRuntimeBuilder,
    TLedger: LedgerBuilder,
    TTails: TailsBuilder,
    TRouter: RouterBuilder,
{
    type RequestEntityAccessor = ProofRequestRecord;
    type ProofEntityAccessor = ProofRecord;

    async fn send_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<ProofRequestRecord, ProofError> {
        request.validate()?;

        let connection = self.connected(connection_id).await?;
        let request_json = request.to_json()?;
        let record = ProofRequestRecord::requested(connection.get_id(), request_json.clone());

        let message = ProofRequestMessage {
            connection_id: connection.get_connection_id(),
            thread_id: record.get_thread_id(),
            request_json,
        };

        self.send(self.crypto(), &connection, ContentMessage::ProofRequest(message))
            .await?;
        self.repo().save_request(&record).await?;

        info!(
            "[proof:send_proof_request] proof request sent: {}",
            record.get_id()
        );

        Ok(record)
    }

    async fn process_proof_request(&self, message: ProofRequestMessage) -> Result<String, ProofError> {
        if message.thread_id.trim().is_empty() {
            return Err(ProofError::ValidationError(
                "proof request thread_id was missing".to_string(),
            ));
        }

        let connection = self
            .connected_by_protocol_id(message.connection_id.clone())
            .await?;

        let repo = self.repo();
        let existing = repo
            .get_request_by_thread_id(connection.get_id(), message.thread_id.clone())
            .await?;

        if let Some(record) = existing {
            debug!(
                "[proof:process_proof_request] proof request already processed: {}",
                record.get_id()
            );
            return Ok(record.get_id());
        }

        ProofRequest::from_json(&message.request_json)?.validate()?;

        let record = ProofRequestRecord::received(
            connection.get_id(),
            message.thread_id,
            message.request_json,
        );
        repo.save_request(&record).await?;

        info!(
            "[proof:process_proof_request] proof request received: {}",
            record.get_id()
        );

        Ok(record.get_id())
    }

    async fn list_credentials_for_request(
        &self,
        request: ProofRequest,
        referent: String,
    ) -> Result<Vec<CredentialInfo>, ProofError> {
        if !request.has_referent(&referent) {
            return Err(ProofError::ValidationError(format!(
                "unknown referent: {}",
                referent
            )));
        }

        self.crypto()
            .search_credentials_for_proof_request(request.to_json()?, referent)
            .await
            .map_err(|err| ProofError::CryptoRuntimeError(err.to_string()))
    }

    async fn accept_proof_request(
        &self,
        request_id: String,
        requested: RequestedCredentials,
    ) -> Result<ProofRequestRecord, ProofError> {
        let repo = self.repo();
        let mut record = repo.get_request(request_id).await?;
        record.ensure(Role::Prover, RequestState::Requested)?;

        let request = ProofRequest::from_json(&record.get_request_json())?;
        request.ensure_covered(&requested)?;

        let connection = self.connected(record.get_connection_id()).await?;

        let crypto = self.crypto();
        let ledger = self.ledger();
        let tails = self.tails();

        let mut schemas = LedgerObjects::new();
        let mut cred_defs = LedgerObjects::new();
        let mut rev_states = TimedLedgerObjects::new();

        for selected in requested.selected() {
            let info = crypto
                .get_credential(selected.cred_id.clone())
                .await
                .map_err(|err| ProofError::CryptoRuntimeError(err.to_string()))?;

            Self::resolve_schema(&ledger, &mut schemas, info.schema_id.clone()).await?;
            Self::resolve_definition(&ledger, &mut cred_defs, info.cred_def_id.clone()).await?;

            let (rev_reg_id, cred_rev_id) = match (info.rev_reg_id, info.cred_rev_id) {
                (Some(rev_reg_id), Some(cred_rev_id)) => (rev_reg_id, cred_rev_id),
                _ => continue,
            };

            let filename = tails.ensure_local(rev_reg_id.clone()).await?;

            let timestamp = match selected.timestamp {
                Some(timestamp) => timestamp,
                None => continue,
            };

            let already_built = rev_states
                .get(&rev_reg_id)
                .map(|states| states.contains_key(&timestamp.to_string()))
                .unwrap_or(false);

            if already_built {
                continue;
            }

            let reader = tails.open_for_read(filename).await?;
            let rev_reg_def_json = Self::resolve_registry_definition(&ledger, rev_reg_id.clone()).await?;

            let (delta_json, _) = ledger
                .lookup_revocation_registry_delta(rev_reg_id.clone(), None, timestamp)
                .await
                .map_err(|err| ProofError::LedgerError(err.to_string()))?
                .ok_or(ProofError::NotFoundError(format!(
                    "revocation registry delta: {}",
                    rev_reg_id
                )))?;

            let state_json = crypto
                .create_revocation_state(reader, rev_reg_def_json, delta_json, timestamp, cred_rev_id)
                .await
                .map_err(|err| ProofError::CryptoRuntimeError(err.to_string()))?;

            rev_states
                .entry(rev_reg_id)
                .or_default()
                .insert(timestamp.to_string(), parse_json(&state_json)?);
        }

        let proof_json = crypto
            .create_proof(
                record.get_request_json(),
                requested.to_json()?,
                self.master_secret_id.to_owned(),
                to_json(&schemas)?,
                to_json(&cred_defs)?,
                to_json(&rev_states)?,
            )
            .await
            .map_err(|err| ProofError::CryptoRuntimeError(err.to_string()))?;

        record.transition(RequestState::Accepted)?;

        let message = ProofMessage {
            connection_id: connection.get_connection_id(),
            thread_id: record.get_thread_id(),
            content: proof_json,
        };

        self.send(crypto, &connection, ContentMessage::Proof(message))
            .await?;
        repo.save_request(&record).await?;

        info!(
            "[proof:accept_proof_request] proof sent: {}",
            record.get_id()
        );

        Ok(record)
    }

    async fn reject_proof_request(&self, request_id: String) -> Result<ProofRequestRecord, ProofError> {
        let repo = self.repo();
        let mut record = repo.get_request(request_id).await?;
        record.ensure(Role::Prover, RequestState::Requested)?;
        record.transition(RequestState::Rejected)?;
        repo.save_request(&record).await?;

        info!(
            "[proof:reject_proof_request] proof request rejected: {}",
            record.get_id()
        );

        Ok(record)
    }

    async fn process_proof(&self, message: ProofMessage) -> Result<String, ProofError> {
        let connection = self
            .connected_by_protocol_id(message.connection_id.clone())
            .await?;

        let repo = self.repo();
        let mut request = repo.get_request(message.thread_id.clone()).await?;

        if request.get_role() != Role::Requester
            || request.get_connection_id() != connection.get_id()
        {
            return Err(ProofError::ProtocolStateError(format!(
                "proof request {} doesn't belong to this connection",
                message.thread_id
            )));
        }

        if let Some(proof) = repo.get_proof_by_request_id(request.get_id()).await? {
            debug!(
                "[proof:process_proof] proof already processed: {}",
                proof.get_id()
            );
            return Ok(proof.get_id());
        }

        request.transition(RequestState::Accepted)?;
        let proof = ProofRecord::new(request.get_id(), connection.get_id(), message.content);

        repo.save_proof(&proof).await?;
        repo.save_request(&request).await?;

        info!("[proof:process_proof] proof received: {}", proof.get_id());
        Ok(proof.get_id())
    }

    async fn verify_proof(&self, proof_id: String) -> Result<bool, ProofError> {
        let repo = self.repo();
        let mut proof = repo.get_proof(proof_id).await?;
        let request = repo.get_request(proof.get_proof_request_id()).await?;

        let ledger = self.ledger();
        let mut schemas = LedgerObjects::new();
        let mut cred_defs = LedgerObjects::new();
        let mut rev_reg_defs = LedgerObjects::new();
        let mut rev_regs = TimedLedgerObjects::new();

        for identifier in proof.identifiers()? {
            Self::resolve_schema(&ledger, &mut schemas, identifier.schema_id).await?;
            Self::resolve_definition(&ledger, &mut cred_defs, identifier.cred_def_id).await?;

            let rev_reg_id = match identifier.rev_reg_id {
                Some(rev_reg_id) => rev_reg_id,
                None => continue,
            };

            if !rev_reg_defs.contains_key(&rev_reg_id) {
                let rev_reg_def_json =
                    Self::resolve_registry_definition(&ledger, rev_reg_id.clone()).await?;
                rev_reg_defs.insert(rev_reg_id.clone(), parse_json(&rev_reg_def_json)?);
            }

            if let Some(timestamp) = identifier.timestamp {
                let (rev_reg_json, _) = ledger
                    .lookup_revocation_registry(rev_reg_id.clone(), timestamp)
                    .await
                    .map_err(|err| ProofError::LedgerError(err.to_string()))?
                    .ok_or(ProofError::NotFoundError(format!(
                        "revocation registry: {}",
                        rev_reg_id
                    )))?;

                rev_regs
                    .entry(rev_reg_id)
                    .or_default()
                    .insert(timestamp.to_string(), parse_json(&rev_reg_json)?);
            }
        }

        let valid = self
            .crypto()
            .verify_proof(
                request.get_request_json(),
                proof.get_proof_json(),
                to_json(&schemas)?,
                to_json(&cred_defs)?,
                to_json(&rev_reg_defs)?,
                to_json(&rev_regs)?,
            )
            .await
            .map_err(|err| ProofError::CryptoRuntimeError(err.to_string()))?;

        let before = proof.get_state();
        if before == ProofState::Proposed {
            proof.transition(ProofState::Accepted)?;
        }

        if valid && proof.get_state() == ProofState::Accepted {
            proof.transition(ProofState::Verified)?;
        }

        if proof.get_state() != before {
            repo.save_proof(&proof).await?;
        }

        info!(
            "[proof:verify_proof] proof {} verified: {}",
            proof.get_id(),
            valid
        );

        Ok(valid)
    }

    async fn get_proof_request(&self, request_id: String) -> Result<ProofRequestRecord, ProofError> {
        self.repo().get_request(request_id).await
    }

    async fn get_proof(&self, proof_id: String) -> Result<ProofRecord, ProofError> {
        self.repo().get_proof(proof_id).await
    }

    async fn list_proof_requests(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<ProofRequestRecord>, ProofError> {
        self.repo().list_requests(connection_id).await
    }
}
