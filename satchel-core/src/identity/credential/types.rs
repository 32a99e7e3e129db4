use std::collections::HashMap;
use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use rstdev_domain::entity::ToJSON;

use crate::identity::connection::types::{ConnectionAPI, ConnectionError};
use crate::identity::connection::Connection;
use crate::messaging::message::{CredentialMessage, CredentialOfferMessage, CredentialRequestMessage};
use crate::messaging::types::{MessagingError, RouterBuilder};
use crate::runtime::types::{CryptoRuntimeBuilder, LedgerBuilder};
use crate::tails::types::{TailsBuilder, TailsError};

#[derive(Debug, PartialEq, Error, Clone)]
pub enum CredentialError {
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

impl From<ConnectionError> for CredentialError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::NotFoundError(msg) => CredentialError::NotFoundError(msg),
            ConnectionError::ProtocolStateError(msg) => CredentialError::ProtocolStateError(msg),
            other => CredentialError::ConnectionError(other.to_string()),
        }
    }
}

/// `State` of a credential exchange, shared by both roles
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum State {
    Offered,
    Requested,
    Issued,
}

impl State {
    fn rank(&self) -> u8 {
        match self {
            State::Offered => 0,
            State::Requested => 1,
            State::Issued => 2,
        }
    }

    pub fn can_advance_to(&self, next: &State) -> bool {
        next.rank() == self.rank() + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Offered => "offered",
            State::Requested => "requested",
            State::Issued => "issued",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum Role {
    Issuer,
    Holder,
}

/// `OfferConfiguration` is the issuer's input of a new credential offer
///
/// Every attribute declared by the schema must be given a value. When
/// `revocation_registry_id` is set, the credential is issued as revocable
#[derive(Debug, Clone, Default)]
pub struct OfferConfiguration {
    pub schema_id: String,
    pub cred_def_id: String,
    pub attribute_values: HashMap<String, String>,
    pub revocation_registry_id: Option<String>,
}

pub trait CredentialEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_id(&self) -> String;
    fn get_connection_id(&self) -> String;
    fn get_thread_id(&self) -> String;
    fn get_role(&self) -> Role;
    fn get_state(&self) -> State;
    fn get_schema_id(&self) -> String;
    fn get_cred_def_id(&self) -> String;
    fn get_offer_json(&self) -> String;
    fn get_values_json(&self) -> Option<String>;
    fn get_request_json(&self) -> Option<String>;
    fn get_request_metadata_json(&self) -> Option<String>;
    fn get_credential_json(&self) -> Option<String>;
    fn get_credential_referent(&self) -> Option<String>;
    fn is_revocable(&self) -> bool;
    fn get_revocation_registry_id(&self) -> Option<String>;
    fn get_revocation_id(&self) -> Option<String>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// CredentialAPI is main entrypoint to communicate with the `Credential` domain
#[async_trait]
pub trait CredentialAPI: Clone {
    type EntityAccessor: CredentialEntityAccessor;

    /// `send_offer` is used by the issuer, the referenced connection must be connected
    async fn send_offer(
        &self,
        connection_id: String,
        config: OfferConfiguration,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    /// `process_offer` is used by the holder to persist an incoming offer
    async fn process_offer(
        &self,
        offer: CredentialOfferMessage,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    /// `accept_offer` is used by the holder to build a credential request with its master secret
    async fn accept_offer(
        &self,
        credential_id: String,
        master_secret_id: String,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    /// `process_credential_request` is used by the issuer to persist the holder's request
    async fn process_credential_request(
        &self,
        request: CredentialRequestMessage,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    /// `issue_credential` is used by the issuer on a requested credential record
    ///
    /// The issued record is saved before the credential is forwarded, calling it again
    /// on an issued record only forwards the stored credential again
    async fn issue_credential(
        &self,
        credential_id: String,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    /// `store_credential` is used by the holder to store the issued credential into its wallet
    async fn store_credential(
        &self,
        credential: CredentialMessage,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    async fn get_credential(
        &self,
        credential_id: String,
    ) -> Result<Self::EntityAccessor, CredentialError>;

    async fn list_credentials(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::EntityAccessor>, CredentialError>;
}

/// Lookups of an unknown record through `get_by_id` must fail with [`CredentialError::NotFoundError`]
#[async_trait]
pub trait RepoBuilder: Clone + Sync + Send {
    type EntityAccessor: CredentialEntityAccessor;

    async fn save(&self, credential: &Self::EntityAccessor) -> Result<(), CredentialError>;

    async fn get_by_id(&self, id: String) -> Result<Self::EntityAccessor, CredentialError>;

    async fn get_by_thread_id(
        &self,
        connection_id: String,
        thread_id: String,
    ) -> Result<Option<Self::EntityAccessor>, CredentialError>;

    async fn list_by_connection(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::EntityAccessor>, CredentialError>;
}

pub trait UsecaseBuilder<TEntityAccessor>: CredentialAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: CredentialEntityAccessor,
{
    type RepoImplementer: RepoBuilder<EntityAccessor = TEntityAccessor>;
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
