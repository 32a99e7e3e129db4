use rst_common::standard::async_trait::async_trait;

use satchel_core::identity::credential::types::{
    CredentialEntityAccessor, CredentialError, RepoBuilder,
};
use satchel_core::identity::credential::Credential;

use super::types::{Instruction, Tags};
use super::Store;

const RECORD_TYPE: &str = "credential";
const TAG_CONNECTION: &str = "connection";
const TAG_THREAD_ID: &str = "thread_id";

#[derive(Clone)]
pub struct Repository {
    db: Store,
}

impl Repository {
    pub fn new(db: Store) -> Self {
        Self { db }
    }

    async fn query(&self, tags: Tags) -> Result<Vec<Credential>, CredentialError> {
        let values = self
            .db
            .exec(Instruction::Query {
                record_type: RECORD_TYPE.to_string(),
                tags,
            })
            .await
            .and_then(|output| output.multiple())
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        let mut credentials = values
            .into_iter()
            .map(Credential::try_from)
            .collect::<Result<Vec<Credential>, CredentialError>>()?;

        credentials.sort_by_key(|credential| credential.get_created_at());
        Ok(credentials)
    }
}

#[async_trait]
impl RepoBuilder for Repository {
    type EntityAccessor = Credential;

    async fn save(&self, credential: &Self::EntityAccessor) -> Result<(), CredentialError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION.to_string(), credential.get_connection_id());
        tags.insert(TAG_THREAD_ID.to_string(), credential.get_thread_id());

        let value: Vec<u8> = credential.to_owned().try_into()?;
        let _ = self
            .db
            .exec(Instruction::Put {
                record_type: RECORD_TYPE.to_string(),
                id: credential.get_id(),
                value,
                tags,
            })
            .await
            .map_err(|err| CredentialError::RepoError(err.to_string()))?;

        Ok(())
    }

    async fn get_by_id(&self, id: String) -> Result<Self::EntityAccessor, CredentialError> {
        let value = self
            .db
            .exec(Instruction::Get {
                record_type: RECORD_TYPE.to_string(),
                id: id.clone(),
            })
            .await
            .and_then(|output| output.single())
            .map_err(|err| CredentialError::RepoError(err.to_string()))?
            .ok_or(CredentialError::NotFoundError(id))?;

        Credential::try_from(value)
    }

    async fn get_by_thread_id(
        &self,
        connection_id: String,
        thread_id: String,
    ) -> Result<Option<Self::EntityAccessor>, CredentialError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION.to_string(), connection_id);
        tags.insert(TAG_THREAD_ID.to_string(), thread_id);

        Ok(self.query(tags).await?.into_iter().next())
    }

    async fn list_by_connection(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::EntityAccessor>, CredentialError> {
        let mut tags = Tags::new();
        if let Some(connection_id) = connection_id {
            tags.insert(TAG_CONNECTION.to_string(), connection_id);
        }

        self.query(tags).await
    }
}
