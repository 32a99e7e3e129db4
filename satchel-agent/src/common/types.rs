use rst_common::with_errors::thiserror::{self, Error};

use satchel_core::identity::connection::types::ConnectionError;
use satchel_core::identity::credential::types::CredentialError;
use satchel_core::identity::proof::types::ProofError;
use satchel_core::messaging::MessagingError;
use satchel_core::tails::TailsError;

#[derive(Debug, PartialEq, Error)]
pub enum CommonError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("db error: {0}")]
    DBError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("connection error: {0}")]
    ConnectionError(#[from] ConnectionError),

    #[error("credential error: {0}")]
    CredentialError(#[from] CredentialError),

    #[error("proof error: {0}")]
    ProofError(#[from] ProofError),

    #[error("messaging error: {0}")]
    MessagingError(#[from] MessagingError),

    #[error("tails error: {0}")]
    TailsError(#[from] TailsError),
}

pub trait ToValidate {
    fn validate(&self) -> Result<(), CommonError>;
}
