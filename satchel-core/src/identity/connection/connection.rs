use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::messaging::types::AgentEndpoint;

use super::types::{ConnectionAlias, ConnectionEntityAccessor, ConnectionError, State};

/// `Connection` is the pairwise relationship between this agent and a peer
///
/// The `id` is local to this agent, the `connection_id` is the protocol level
/// identifier shared by both peers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Connection {
    pub(crate) id: String,

    #[serde(rename = "connectionId")]
    pub(crate) connection_id: String,

    pub(crate) state: State,

    #[serde(rename = "myKey")]
    pub(crate) my_key: String,

    #[serde(rename = "theirKey")]
    pub(crate) their_key: Option<String>,

    #[serde(rename = "theirEndpoint")]
    pub(crate) their_endpoint: Option<AgentEndpoint>,

    #[serde(rename = "myAlias")]
    pub(crate) my_alias: Option<ConnectionAlias>,

    #[serde(rename = "theirAlias")]
    pub(crate) their_alias: Option<ConnectionAlias>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(connection_id: String, my_key: String, state: State) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            connection_id,
            state,
            my_key,
            their_key: None,
            their_endpoint: None,
            my_alias: None,
            their_alias: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn set_my_alias(&mut self, alias: Option<ConnectionAlias>) -> &mut Self {
        self.my_alias = alias;
        self
    }

    pub fn set_their_alias(&mut self, alias: Option<ConnectionAlias>) -> &mut Self {
        self.their_alias = alias;
        self
    }

    /// `set_peer` stores the peer key and its inbox. Envelopes delivered to the
    /// endpoint are always packed for the peer key
    pub fn set_peer(&mut self, their_key: String, endpoint: String) -> &mut Self {
        self.their_endpoint = Some(AgentEndpoint::new(endpoint, Some(their_key.clone())));
        self.their_key = Some(their_key);
        self.updated_at = Utc::now();
        self
    }

    /// `transition` moves the connection to its next state
    pub fn transition(&mut self, next: State) -> Result<(), ConnectionError> {
        if !self.state.can_advance_to(&next) {
            return Err(ConnectionError::ProtocolStateError(format!(
                "connection {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.state == State::Connected
    }

    /// `outbound` returns the keys and the endpoint needed to send a message to the peer
    pub fn outbound(&self) -> Result<(String, String, AgentEndpoint), ConnectionError> {
        match (self.their_key.to_owned(), self.their_endpoint.to_owned()) {
            (Some(their_key), Some(endpoint)) => Ok((self.my_key.to_owned(), their_key, endpoint)),
            _ => Err(ConnectionError::ProtocolStateError(format!(
                "connection {} has no peer yet",
                self.id
            ))),
        }
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| ConnectionError::EntityError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|err| ConnectionError::EntityError(err.to_string()))
    }
}

impl ConnectionEntityAccessor for Connection {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_connection_id(&self) -> String {
        self.connection_id.to_owned()
    }

    fn get_state(&self) -> State {
        self.state.to_owned()
    }

    fn get_my_key(&self) -> String {
        self.my_key.to_owned()
    }

    fn get_their_key(&self) -> Option<String> {
        self.their_key.to_owned()
    }

    fn get_their_endpoint(&self) -> Option<AgentEndpoint> {
        self.their_endpoint.to_owned()
    }

    fn get_my_alias(&self) -> Option<ConnectionAlias> {
        self.my_alias.to_owned()
    }

    fn get_their_alias(&self) -> Option<ConnectionAlias> {
        self.their_alias.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
