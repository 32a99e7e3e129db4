use std::collections::HashMap;

use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, PartialEq, Error, Clone)]
pub enum StoreError {
    #[error("db error: {0}")]
    DbError(String),
}

pub type Tags = HashMap<String, String>;

pub enum Instruction {
    Put {
        record_type: String,
        id: String,
        value: Vec<u8>,
        tags: Tags,
    },
    Get {
        record_type: String,
        id: String,
    },
    Query {
        record_type: String,
        tags: Tags,
    },
}

#[derive(Debug)]
pub enum OutputOpts {
    SingleByte { value: Option<Vec<u8>> },
    MultiBytes { values: Vec<Vec<u8>> },
    None,
}

impl OutputOpts {
    pub fn is_none(&self) -> bool {
        matches!(self, OutputOpts::None)
    }

    pub fn single(self) -> Result<Option<Vec<u8>>, StoreError> {
        match self {
            OutputOpts::SingleByte { value } => Ok(value),
            _ => Err(StoreError::DbError(
                "expected a single record output".to_string(),
            )),
        }
    }

    pub fn multiple(self) -> Result<Vec<Vec<u8>>, StoreError> {
        match self {
            OutputOpts::MultiBytes { values } => Ok(values),
            _ => Err(StoreError::DbError(
                "expected a multiple records output".to_string(),
            )),
        }
    }
}
