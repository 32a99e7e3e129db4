use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use rstdev_domain::entity::ToJSON;

use crate::identity::connection::types::{ConnectionAPI, ConnectionError};
use crate::identity::connection::Connection;
use crate::messaging::message::{ProofMessage, ProofRequestMessage};
use crate::messaging::types::{MessagingError, RouterBuilder};
use crate::runtime::types::{CredentialInfo, CryptoRuntimeBuilder, LedgerBuilder};
use crate::tails::types::{TailsBuilder, TailsError};

use super::request::{ProofRequest, RequestedCredentials};

#[derive(Debug, PartialEq, Error, Clone)]
pub enum ProofError {
    #[error("protocol state error: {0}")]
    ProtocolStateError(String),

    #[error("not found: {0}")]
    NotFoundError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("crypto runtime error: {0}")]
    CryptoRuntimeError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("repo error: {0}")]
    RepoError(String),

    #[error("json error: {0}")]
    JSONError(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("messaging error: {0}")]
    MessagingError(#[from] MessagingError),

    #[error("tails error: {0}")]
    TailsError(#[from] TailsError),
}

impl From<ConnectionError> for ProofError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotFoundError(msg) => ProofError::NotFoundError(msg),
            ConnectionError::ProtocolStateError(msg) => ProofError::ProtocolStateError(msg),
            other => ProofError::ConnectionError(other.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum Role {
    Requester,
    Prover,
}

/// `RequestState` of a proof request, a request is either accepted or rejected once
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum RequestState {
    Requested,
    Accepted,
    Rejected,
}

impl RequestState {
    pub fn can_advance_to(&self, next: &RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Requested, RequestState::Accepted)
                | (RequestState::Requested, RequestState::Rejected)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Requested => "requested",
            RequestState::Accepted => "accepted",
            RequestState::Rejected => "rejected",
        }
    }
}

/// `ProofState` of a received proof
///
/// A proof becomes [`ProofState::Accepted`] once its verification ran and
/// [`ProofState::Verified`] only when the verification succeeded
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum ProofState {
    Proposed,
    Accepted,
    Verified,
}

impl ProofState {
    fn rank(&self) -> u8 {
        match self {
            ProofState::Proposed => 0,
            ProofState::Accepted => 1,
            ProofState::Verified => 2,
        }
    }

    pub fn can_advance_to(&self, next: &ProofState) -> bool {
        next.rank() == self.rank() + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProofState::Proposed => "proposed",
            ProofState::Accepted => "accepted",
            ProofState::Verified => "verified",
        }
    }
}

pub trait ProofRequestEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_id(&self) -> String;
    fn get_connection_id(&self) -> String;
    fn get_thread_id(&self) -> String;
    fn get_role(&self) -> Role;
    fn get_state(&self) -> RequestState;
    fn get_request_json(&self) -> String;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

pub trait ProofEntityAccessor: Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>> {
    fn get_id(&self) -> String;
    fn get_proof_request_id(&self) -> String;
    fn get_connection_id(&self) -> String;
    fn get_state(&self) -> ProofState;
    fn get_proof_json(&self) -> String;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// ProofAPI is main entrypoint to communicate with the `Proof` domain
#[async_trait]
pub trait ProofAPI: Clone {
    type RequestEntityAccessor: ProofRequestEntityAccessor;
    type ProofEntityAccessor: ProofEntityAccessor;

    /// `send_proof_request` is used by the verifier over a connected connection
    async fn send_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<Self::RequestEntityAccessor, ProofError>;

    /// `process_proof_request` persists an incoming request and returns its local id
    async fn process_proof_request(&self, message: ProofRequestMessage)
        -> Result<String, ProofError>;

    /// `list_credentials_for_request` returns the wallet credentials able to satisfy
    /// the given referent. The order of the candidates is not guaranteed
    async fn list_credentials_for_request(
        &self,
        request: ProofRequest,
        referent: String,
    ) -> Result<Vec<CredentialInfo>, ProofError>;

    /// `accept_proof_request` builds the proof from the prover's selection and sends it back
    async fn accept_proof_request(
        &self,
        request_id: String,
        requested: RequestedCredentials,
    ) -> Result<Self::RequestEntityAccessor, ProofError>;

    /// `reject_proof_request` only changes the local record, nothing is sent to the verifier
    async fn reject_proof_request(
        &self,
        request_id: String,
    ) -> Result<Self::RequestEntityAccessor, ProofError>;

    /// `process_proof` persists an incoming proof and returns its local id
    async fn process_proof(&self, message: ProofMessage) -> Result<String, ProofError>;

    /// `verify_proof` returns `false` for a proof that doesn't verify, it is not an error
    async fn verify_proof(&self, proof_id: String) -> Result<bool, ProofError>;

    async fn get_proof_request(
        &self,
        request_id: String,
    ) -> Result<Self::RequestEntityAccessor, ProofError>;

    async fn get_proof(&self, proof_id: String) -> Result<Self::ProofEntityAccessor, ProofError>;

    async fn list_proof_requests(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::RequestEntityAccessor>, ProofError>;
}

/// Lookups of an unknown record by id must fail with [`ProofError::NotFoundError`]
#[async_trait]
pub trait RepoBuilder: Clone + Sync + Send {
    type RequestEntityAccessor: ProofRequestEntityAccessor;
    type ProofEntityAccessor: ProofEntityAccessor;

    async fn save_request(&self, request: &Self::RequestEntityAccessor) -> Result<(), ProofError>;

    async fn get_request(&self, id: String) -> Result<Self::RequestEntityAccessor, ProofError>;

    async fn get_request_by_thread_id(
        &self,
        connection_id: String,
        thread_id: String,
    ) -> Result<Option<Self::RequestEntityAccessor>, ProofError>;

    async fn list_requests(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::RequestEntityAccessor>, ProofError>;

    async fn save_proof(&self, proof: &Self::ProofEntityAccessor) -> Result<(), ProofError>;

    async fn get_proof(&self, id: String) -> Result<Self::ProofEntityAccessor, ProofError>;

    async fn get_proof_by_request_id(
        &self,
        proof_request_id: String,
    ) -> Result<Option<Self::ProofEntityAccessor>, ProofError>;
}

pub trait UsecaseBuilder<TRequest, TProof>:
    ProofAPI<RequestEntityAccessor = TRequest, ProofEntityAccessor = TProof>
where
    TRequest: ProofRequestEntityAccessor,
    TProof: ProofEntityAccessor,
{
    type RepoImplementer: RepoBuilder<RequestEntityAccessor = TRequest, ProofEntityAccessor = TProof>;
    type ConnectionImplementer: ConnectionAPI<EntityAccessor = Connection>;
    type CryptoImplementer: CryptoRuntimeBuilder;
    type LedgerImplementer: LedgerBuilder;
    type TailsImplementer: TailsBuilder;
    type RouterImplementer: RouterBuilder;

    fn repo(&self) -> Self::RepoImplementer;
    fn connection(&self) -> Self::ConnectionImplementer;
    fn crypto(&self) -> Self::CryptoImplementer;
    fn ledger(&self) -> Self::LedgerImplementer;
    fn tails(&self) -> Self::TailsImplementer;
    fn router(&self) -> Self::RouterImplementer;
}
