use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use crate::tails::TailsReader;

/// `RuntimeError` is a pass-through error of the external collaborators
#[derive(Debug, PartialEq, Error, Clone)]
pub enum RuntimeError {
    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnpackedPayload {
    pub message: Vec<u8>,
    pub sender_key: Option<String>,
}

/// `IssuedCredential` is the issuer side output of a credential issuance
///
/// `revocation_id` and `revocation_delta_json` are only available for a revocable
/// credential definition
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedCredential {
    pub credential_json: String,
    pub revocation_id: Option<String>,
    pub revocation_delta_json: Option<String>,
}

/// `CredentialInfo` is a credential held in the holder's wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct CredentialInfo {
    pub referent: String,
    pub attrs: HashMap<String, String>,
    pub schema_id: String,
    pub cred_def_id: String,
    pub rev_reg_id: Option<String>,
    pub cred_rev_id: Option<String>,
}

/// `CryptoRuntimeBuilder` is the cryptographic agent runtime
///
/// It owns the wallet, the keys and every anonymous credential primitive. All JSON
/// parameters and outputs are opaque objects in the runtime's own format
#[async_trait]
pub trait CryptoRuntimeBuilder: Clone + Sync + Send {
    async fn create_key(&self) -> Result<String, RuntimeError>;

    async fn pack(
        &self,
        message: Vec<u8>,
        recipient_key: String,
        sender_key: Option<String>,
    ) -> Result<Vec<u8>, RuntimeError>;

    async fn unpack(
        &self,
        ciphertext: Vec<u8>,
        my_key: String,
    ) -> Result<UnpackedPayload, RuntimeError>;

    async fn create_credential_offer(&self, cred_def_id: String) -> Result<String, RuntimeError>;

    /// Returns the credential request and its metadata, the metadata stays at the holder
    async fn create_credential_request(
        &self,
        prover_key: String,
        offer_json: String,
        cred_def_json: String,
        master_secret_id: String,
    ) -> Result<(String, String), RuntimeError>;

    async fn create_credential(
        &self,
        offer_json: String,
        request_json: String,
        values_json: String,
        rev_reg_id: Option<String>,
        tails: Option<Arc<TailsReader>>,
    ) -> Result<IssuedCredential, RuntimeError>;

    /// Stores the credential in the holder's wallet and returns its wallet referent
    async fn store_credential(
        &self,
        request_metadata_json: String,
        credential_json: String,
        cred_def_json: String,
        rev_reg_def_json: Option<String>,
    ) -> Result<String, RuntimeError>;

    async fn search_credentials_for_proof_request(
        &self,
        request_json: String,
        referent: String,
    ) -> Result<Vec<CredentialInfo>, RuntimeError>;

    async fn get_credential(&self, credential_id: String) -> Result<CredentialInfo, RuntimeError>;

    async fn create_revocation_state(
        &self,
        tails: Arc<TailsReader>,
        rev_reg_def_json: String,
        rev_reg_delta_json: String,
        timestamp: u64,
        cred_rev_id: String,
    ) -> Result<String, RuntimeError>;

    async fn create_proof(
        &self,
        request_json: String,
        requested_credentials_json: String,
        master_secret_id: String,
        schemas_json: String,
        cred_defs_json: String,
        rev_states_json: String,
    ) -> Result<String, RuntimeError>;

    async fn verify_proof(
        &self,
        request_json: String,
        proof_json: String,
        schemas_json: String,
        cred_defs_json: String,
        rev_reg_defs_json: String,
        rev_regs_json: String,
    ) -> Result<bool, RuntimeError>;
}

/// `LedgerBuilder` is the distributed ledger client
///
/// Lookups return `None` when the ledger has no object for the given id
#[async_trait]
pub trait LedgerBuilder: Clone + Sync + Send {
    async fn lookup_schema(&self, schema_id: String) -> Result<Option<String>, RuntimeError>;

    async fn lookup_definition(&self, cred_def_id: String) -> Result<Option<String>, RuntimeError>;

    async fn lookup_revocation_registry_definition(
        &self,
        rev_reg_id: String,
    ) -> Result<Option<String>, RuntimeError>;

    /// Returns the registry delta and the timestamp it was resolved at
    async fn lookup_revocation_registry_delta(
        &self,
        rev_reg_id: String,
        from: Option<u64>,
        to: u64,
    ) -> Result<Option<(String, u64)>, RuntimeError>;

    /// Returns the registry state and the timestamp it was resolved at
    async fn lookup_revocation_registry(
        &self,
        rev_reg_id: String,
        timestamp: u64,
    ) -> Result<Option<(String, u64)>, RuntimeError>;

    async fn send_revocation_registry_entry(
        &self,
        rev_reg_id: String,
        delta_json: String,
    ) -> Result<(), RuntimeError>;
}
