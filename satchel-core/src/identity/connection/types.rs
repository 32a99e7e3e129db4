use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use rstdev_domain::entity::ToJSON;

use crate::messaging::message::{
    ConnectionAcknowledgeMessage, ConnectionRequestMessage, ConnectionResponseMessage,
    InvitationMessage,
};
use crate::messaging::types::{AgentEndpoint, MessagingError, RouterBuilder};
use crate::runtime::types::CryptoRuntimeBuilder;

/// `ConnectionError` is a base error types for the `Connection` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ConnectionError {
    #[error("protocol state error: {0}")]
    ProtocolStateError(String),

    #[error("connection not found: {0}")]
    NotFoundError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("crypto runtime error: {0}")]
    CryptoRuntimeError(String),

    #[error("repo error: {0}")]
    RepoError(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("messaging error: {0}")]
    MessagingError(#[from] MessagingError),
}

/// State represent connection's states between two agents
///
/// The inviter starts at [`State::Invited`], the invitee starts at [`State::Negotiating`]
/// once it accepts the invitation. Both sides end at [`State::Connected`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub enum State {
    Invited,
    Negotiating,
    Connected,
}

impl State {
    fn rank(&self) -> u8 {
        match self {
            State::Invited => 0,
            State::Negotiating => 1,
            State::Connected => 2,
        }
    }

    /// A state only advances to its direct successor
    pub fn can_advance_to(&self, next: &State) -> bool {
        next.rank() == self.rank() + 1
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Invited => "invited",
            State::Negotiating => "negotiating",
            State::Connected => "connected",
        }
    }
}

/// `ConnectionAlias` is the human readable information of an agent owner
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(crate = "self::serde")]
pub struct ConnectionAlias {
    pub name: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ConnectionAlias {
    pub fn new(name: String, image_url: Option<String>) -> Self {
        Self { name, image_url }
    }
}

/// `InviteConfiguration` customizes a new invitation
///
/// When `connection_id` is empty, a new one will be generated
#[derive(Debug, Clone, Default)]
pub struct InviteConfiguration {
    pub connection_id: Option<String>,
    pub my_alias: Option<ConnectionAlias>,
    pub their_alias: Option<ConnectionAlias>,
}

/// `ConnectionEntityAccessor` it's a special trait used to access main Connection entity
/// property fields from outside of this crate
pub trait ConnectionEntityAccessor:
    Clone + Debug + ToJSON + TryInto<Vec<u8>> + TryFrom<Vec<u8>>
{
    fn get_id(&self) -> String;
    fn get_connection_id(&self) -> String;
    fn get_state(&self) -> State;
    fn get_my_key(&self) -> String;
    fn get_their_key(&self) -> Option<String>;
    fn get_their_endpoint(&self) -> Option<AgentEndpoint>;
    fn get_my_alias(&self) -> Option<ConnectionAlias>;
    fn get_their_alias(&self) -> Option<ConnectionAlias>;
    fn get_created_at(&self) -> DateTime<Utc>;
    fn get_updated_at(&self) -> DateTime<Utc>;
}

/// ConnectionAPI is main entrypoint to communicate with the `Connection` domain
#[async_trait]
pub trait ConnectionAPI: Clone {
    type EntityAccessor: ConnectionEntityAccessor;

    /// `create_invitation` generates a fresh key and a connection id, and returns the
    /// out-of-band invitation payload that must be transmitted through a side channel
    async fn create_invitation(
        &self,
        config: InviteConfiguration,
    ) -> Result<(Self::EntityAccessor, InvitationMessage), ConnectionError>;

    /// `accept_invitation` is used by the invitee. It generates its own key and sends
    /// a connection request to the inviter's endpoint
    async fn accept_invitation(
        &self,
        invitation: InvitationMessage,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    /// `process_request` is used by the inviter when the invitee's request arrives
    async fn process_request(
        &self,
        request: ConnectionRequestMessage,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    /// `process_response` is used by the invitee. The connection becomes connected and
    /// an acknowledgement is sent back so the inviter is able to complete too
    async fn process_response(
        &self,
        response: ConnectionResponseMessage,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn process_acknowledgement(
        &self,
        ack: ConnectionAcknowledgeMessage,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn get_connection(&self, id: String) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn get_by_connection_id(
        &self,
        connection_id: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn list_connections(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Self::EntityAccessor>, ConnectionError>;
}

/// RepoBuilder is a `Connection Repository` abstraction by implementing repository pattern
///
/// Lookups of an unknown record must fail with [`ConnectionError::NotFoundError`]
#[async_trait]
pub trait RepoBuilder: Clone + Sync + Send {
    type EntityAccessor: ConnectionEntityAccessor;

    async fn save(&self, connection: &Self::EntityAccessor) -> Result<(), ConnectionError>;

    async fn get_by_id(&self, id: String) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn get_by_connection_id(
        &self,
        connection_id: String,
    ) -> Result<Self::EntityAccessor, ConnectionError>;

    async fn list_by_state(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Self::EntityAccessor>, ConnectionError>;
}

/// `UsecaseBuilder` is a trait behavior that provides
/// base application logic's handlers
pub trait UsecaseBuilder<TEntityAccessor>: ConnectionAPI<EntityAccessor = TEntityAccessor>
where
    TEntityAccessor: ConnectionEntityAccessor,
{
    type RepoImplementer: RepoBuilder<EntityAccessor = TEntityAccessor>;
    type CryptoImplementer: CryptoRuntimeBuilder;
    type RouterImplementer: RouterBuilder;

    fn repo(&self) -> Self::RepoImplementer;
    fn crypto(&self) -> Self::CryptoImplementer;
    fn router(&self) -> Self::RouterImplementer;
}
