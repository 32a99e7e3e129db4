use rst_common::standard::async_trait::async_trait;

use satchel_core::identity::proof::types::{
    ProofEntityAccessor, ProofError, ProofRequestEntityAccessor, RepoBuilder,
};
use satchel_core::identity::proof::{ProofRecord, ProofRequestRecord};

use super::types::{Instruction, Tags};
use super::Store;

const RECORD_TYPE_REQUEST: &str = "proof_request";
const RECORD_TYPE_PROOF: &str = "proof";
const TAG_CONNECTION: &str = "connection";
const TAG_THREAD_ID: &str = "thread_id";
const TAG_PROOF_REQUEST_ID: &str = "proof_request_id";

#[derive(Clone)]
pub struct Repository {
    db: Store,
}

impl Repository {
    pub fn new(db: Store) -> Self {
        Self { db }
    }

    async fn put(
        &self,
        record_type: &str,
        id: String,
        value: Vec<u8>,
        tags: Tags,
    ) -> Result<(), ProofError> {
        let _ = self
            .db
            .exec(Instruction::Put {
                record_type: record_type.to_string(),
                id,
                value,
                tags,
            })
            .await
            .map_err(|err| ProofError::RepoError(err.to_string()))?;

        Ok(())
    }

    async fn get(&self, record_type: &str, id: String) -> Result<Vec<u8>, ProofError> {
        self.db
            .exec(Instruction::Get {
                record_type: record_type.to_string(),
                id: id.clone(),
            })
            .await
            .and_then(|output| output.single())
            .map_err(|err| ProofError::RepoError(err.to_string()))?
            .ok_or(ProofError::NotFoundError(format!("{}: {}", record_type, id)))
    }

    async fn query(&self, record_type: &str, tags: Tags) -> Result<Vec<Vec<u8>>, ProofError> {
        self.db
            .exec(Instruction::Query {
                record_type: record_type.to_string(),
                tags,
            })
            .await
            .and_then(|output| output.multiple())
            .map_err(|err| ProofError::RepoError(err.to_string()))
    }

    async fn query_requests(&self, tags: Tags) -> Result<Vec<ProofRequestRecord>, ProofError> {
        let mut requests = self
            .query(RECORD_TYPE_REQUEST, tags)
            .await?
            .into_iter()
            .map(ProofRequestRecord::try_from)
            .collect::<Result<Vec<ProofRequestRecord>, ProofError>>()?;

        requests.sort_by_key(|request| request.get_created_at());
        Ok(requests)
    }
}

#[async_trait]
impl RepoBuilder for Repository {
    type RequestEntityAccessor = ProofRequestRecord;
    type ProofEntityAccessor = ProofRecord;

    async fn save_request(&self, request: &Self::RequestEntityAccessor) -> Result<(), ProofError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION.to_string(), request.get_connection_id());
        tags.insert(TAG_THREAD_ID.to_string(), request.get_thread_id());

        let value: Vec<u8> = request.to_owned().try_into()?;
        self.put(RECORD_TYPE_REQUEST, request.get_id(), value, tags)
            .await
    }

    async fn get_request(&self, id: String) -> Result<Self::RequestEntityAccessor, ProofError> {
        let value = self.get(RECORD_TYPE_REQUEST, id).await?;
        ProofRequestRecord::try_from(value)
    }

    async fn get_request_by_thread_id(
        &self,
        connection_id: String,
        thread_id: String,
    ) -> Result<Option<Self::RequestEntityAccessor>, ProofError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION.to_string(), connection_id);
        tags.insert(TAG_THREAD_ID.to_string(), thread_id);

        Ok(self.query_requests(tags).await?.into_iter().next())
    }

    async fn list_requests(
        &self,
        connection_id: Option<String>,
    ) -> Result<Vec<Self::RequestEntityAccessor>, ProofError> {
        let mut tags = Tags::new();
        if let Some(connection_id) = connection_id {
            tags.insert(TAG_CONNECTION.to_string(), connection_id);
        }

        self.query_requests(tags).await
    }

    async fn save_proof(&self, proof: &Self::ProofEntityAccessor) -> Result<(), ProofError> {
        let mut tags = Tags::new();
        tags.insert(TAG_CONNECTION.to_string(), proof.get_connection_id());
        tags.insert(
            TAG_PROOF_REQUEST_ID.to_string(),
            proof.get_proof_request_id(),
        );

        let value: Vec<u8> = proof.to_owned().try_into()?;
        self.put(RECORD_TYPE_PROOF, proof.get_id(), value, tags)
            .await
    }

    async fn get_proof(&self, id: String) -> Result<Self::ProofEntityAccessor, ProofError> {
        let value = self.get(RECORD_TYPE_PROOF, id).await?;
        ProofRecord::try_from(value)
    }

    async fn get_proof_by_request_id(
        &self,
        proof_request_id: String,
    ) -> Result<Option<Self::ProofEntityAccessor>, ProofError> {
        let mut tags = Tags::new();
        tags.insert(TAG_PROOF_REQUEST_ID.to_string(), proof_request_id);

        let proof = self
            .query(RECORD_TYPE_PROOF, tags)
            .await?
            .into_iter()
            .next()
            .map(ProofRecord::try_from)
            .transpose()?;

        Ok(proof)
    }
}
