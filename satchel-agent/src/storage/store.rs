use std::sync::Arc;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::Mutex;

use rstdev_storage::engine::rocksdb::executor::Executor;
use rstdev_storage::engine::rocksdb::types::{
    Instruction as DbInstruction, OutputOpts as DbOutput,
};

use super::types::{Instruction, OutputOpts, StoreError, Tags};

const INDEX_PREFIX: &str = "index";

#[derive(Serialize, Deserialize)]
#[serde(crate = "self::serde")]
struct Record {
    value: Vec<u8>,
    tags: Tags,
}

/// `Store` keeps wallet records in a RocksDB column family
///
/// A record lives at `<record_type>:<id>` together with its tags, and every
/// record type keeps the list of its ids at `index:<record_type>`. A `Put`
/// replaces the whole record including its tags. Clones share the same
/// database and the same index lock
#[derive(Clone)]
pub struct Store {
    db: Executor,
    index_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(db: Executor) -> Self {
        Self {
            db,
            index_lock: Arc::new(Mutex::new(())),
        }
    }

    fn build_key(record_type: &str, id: &str) -> String {
        format!("{}:{}", record_type, id)
    }

    fn build_index_key(record_type: &str) -> String {
        Self::build_key(INDEX_PREFIX, record_type)
    }

    async fn get_bytes(&self, key: String) -> Result<Option<Vec<u8>>, StoreError> {
        let output = self
            .db
            .exec(DbInstruction::GetCf { key })
            .await
            .map_err(|err| StoreError::DbError(err.to_string()))?;

        match output {
            DbOutput::SingleByte { value } => Ok(value),
            _ => Err(StoreError::DbError("unknown output type".to_string())),
        }
    }

    async fn save_bytes(&self, key: String, value: Vec<u8>) -> Result<(), StoreError> {
        let _ = self
            .db
            .exec(DbInstruction::SaveCf { key, value })
            .await
            .map_err(|err| StoreError::DbError(err.to_string()))?;

        Ok(())
    }

    async fn load_index(&self, record_type: &str) -> Result<Vec<String>, StoreError> {
        let ids = self
            .get_bytes(Self::build_index_key(record_type))
            .await?
            .map(|value| serde_json::from_slice::<Vec<String>>(&value))
            .transpose()
            .map_err(|err| StoreError::DbError(err.to_string()))?
            .unwrap_or_default();

        Ok(ids)
    }

    async fn put(
        &self,
        record_type: String,
        id: String,
        value: Vec<u8>,
        tags: Tags,
    ) -> Result<(), StoreError> {
        let key = Self::build_key(&record_type, &id);
        let record = serde_json::to_vec(&Record { value, tags })
            .map_err(|err| StoreError::DbError(err.to_string()))?;

        let _guard = self.index_lock.lock().await;

        debug!("[store:put] saving record: {}", key);
        self.save_bytes(key, record).await?;

        let mut ids = self.load_index(&record_type).await?;
        if !ids.contains(&id) {
            ids.push(id);

            let index = serde_json::to_vec(&ids)
                .map_err(|err| StoreError::DbError(err.to_string()))?;
            self.save_bytes(Self::build_index_key(&record_type), index)
                .await?;
        }

        Ok(())
    }

    async fn get(&self, record_type: String, id: String) -> Result<Option<Vec<u8>>, StoreError> {
        let record = self
            .get_bytes(Self::build_key(&record_type, &id))
            .await?
            .map(|value| serde_json::from_slice::<Record>(&value))
            .transpose()
            .map_err(|err| StoreError::DbError(err.to_string()))?;

        Ok(record.map(|record| record.value))
    }

    async fn query(&self, record_type: String, tags: Tags) -> Result<Vec<Vec<u8>>, StoreError> {
        let ids = self.load_index(&record_type).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys = ids
            .iter()
            .map(|id| Self::build_key(&record_type, id))
            .collect();

        let output = self
            .db
            .exec(DbInstruction::MultiGetCf { keys })
            .await
            .map_err(|err| StoreError::DbError(err.to_string()))?;

        let values = match output {
            DbOutput::MultiBytes { values } => Ok(values),
            _ => Err(StoreError::DbError("unknown output type".to_string())),
        }?;

        let mut records = Vec::new();
        for value in values {
            let bytes = value.map_err(|err| StoreError::DbError(err.to_string()))?;
            let Some(bytes) = bytes else {
                continue;
            };

            let record: Record = serde_json::from_slice(&bytes)
                .map_err(|err| StoreError::DbError(err.to_string()))?;

            let matched = tags
                .iter()
                .all(|(name, value)| record.tags.get(name) == Some(value));

            if matched {
                records.push(record.value);
            }
        }

        Ok(records)
    }

    pub async fn exec(&self, instruction: Instruction) -> Result<OutputOpts, StoreError> {
        match instruction {
            Instruction::Put {
                record_type,
                id,
                value,
                tags,
            } => {
                self.put(record_type, id, value, tags).await?;
                Ok(OutputOpts::None)
            }
            Instruction::Get { record_type, id } => {
                let value = self.get(record_type, id).await?;
                Ok(OutputOpts::SingleByte { value })
            }
            Instruction::Query { record_type, tags } => {
                let values = self.query(record_type, tags).await?;
                Ok(OutputOpts::MultiBytes { values })
            }
        }
    }
}
