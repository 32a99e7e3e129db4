use rst_common::standard::async_trait::async_trait;

use satchel_core::identity::connection::types::{
    ConnectionEntityAccessor, ConnectionError, RepoBuilder, State,
};
use satchel_core::identity::connection::Connection;

use super::types::{Instruction, Tags};
use super::Store;

const RECORD_TYPE: &str = "connection";
const TAG_CONNECTION_ID: &str = "connection_id";
const TAG_STATE: &str = "state";

#[derive(Clone)]
pub struct Repository {
    db: Store,
}

impl Repository {
    pub fn new(db: Store) -> Self {
        Self { db }
    }

    async fn query(&self, tags: Tags) -> Result<Vec<Connection>, ConnectionError> {
        let values = self
            .db
            .exec(Instruction::Query {
                record_type: RECORD_TYPE.to_string(),
                tags,
            })
            .await
            .and_then(|output| output.multiple())
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        let mut connections = values
            .into_iter()
            .map(Connection::try_from)
            .collect::<Result<Vec<Connection>, ConnectionError>>()?;

        connections.sort_by_key(|connection| connection.get_created_at());
        Ok(connections)
    }
}

#[async_trait]
impl RepoBuilder for Repository {
    type EntityAccessor = Connection;

    async fn save(&self, connection: &Self::EntityAccessor) -> Result<(), ConnectionError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION_ID.to_string(), connection.get_connection_id());
        tags.insert(
            TAG_STATE.to_string(),
            connection.get_state().as_str().to_string(),
        );

        let value: Vec<u8> = connection.to_owned().try_into()?;
        let _ = self
            .db
            .exec(Instruction::Put {
                record_type: RECORD_TYPE.to_string(),
                id: connection.get_id(),
                value,
                tags,
            })
            .await
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?;

        Ok(())
    }

    async fn get_by_id(&self, id: String) -> Result<Self::EntityAccessor, ConnectionError> {
        let value = self
            .db
            .exec(Instruction::Get {
                record_type: RECORD_TYPE.to_string(),
                id: id.clone(),
            })
            .await
            .and_then(|output| output.single())
            .map_err(|err| ConnectionError::RepoError(err.to_string()))?
            .ok_or(ConnectionError::NotFoundError(id))?;

        Connection::try_from(value)
    }

    async fn get_by_connection_id(
        &self,
        connection_id: String,
    ) -> Result<Self::EntityAccessor, ConnectionError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION_ID.to_string(), connection_id.clone());

        self.query(tags)
            .await?
            .into_iter()
            .next()
            .ok_or(ConnectionError::NotFoundError(connection_id))
    }

    async fn list_by_state(
        &self,
        state: Option<State>,
    ) -> Result<Vec<Self::EntityAccessor>, ConnectionError> {
        let mut tags = Tags::new();
        if let Some(state) = state {
            tags.insert(TAG_STATE.to_string(), state.as_str().to_string());
        }

        self.query(tags).await
    }
}
