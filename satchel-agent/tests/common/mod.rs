#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, json, Map, Value};
use rst_common::standard::uuid::Uuid;

use satchel_agent::{Agent, ConfigParser, Dispatched};
use satchel_core::identity::proof::request::RequestedCredentials;
use satchel_core::messaging::types::RouterBuilder;
use satchel_core::messaging::{AgentEndpoint, EnvelopeMessage, MessagingError};
use satchel_core::runtime::types::{
    CredentialInfo, CryptoRuntimeBuilder, IssuedCredential, LedgerBuilder, RuntimeError,
    UnpackedPayload,
};
use satchel_core::tails::TailsReader;

pub const SCHEMA_ID: &str = "schema:person:1.0";
pub const CRED_DEF_ID: &str = "creddef:person:1";
pub const REV_REG_ID: &str = "revreg:person:1";
pub const TAILS_HASH: &str = "8DfeqbU2DMMrzjsQjBWR5GMcH9SXXJBBXhxzs2hz9Nij";

pub type FakeAgent = Agent<FakeRuntime, FakeLedger, CapturingRouter>;

fn parse(json: &str) -> Result<Value, RuntimeError> {
    serde_json::from_str(json).map_err(|err| RuntimeError::CryptoError(err.to_string()))
}

/// `FakeRuntime` stands in for the crypto runtime. Envelopes are plain JSON
/// addressed to the recipient key, credentials are kept in an in-memory wallet
#[derive(Clone)]
pub struct FakeRuntime {
    wallet: Arc<Mutex<HashMap<String, CredentialInfo>>>,
    schemas_by_definition: HashMap<String, String>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        let mut schemas_by_definition = HashMap::new();
        schemas_by_definition.insert(CRED_DEF_ID.to_string(), SCHEMA_ID.to_string());

        Self {
            wallet: Arc::new(Mutex::new(HashMap::new())),
            schemas_by_definition,
        }
    }

    fn wallet_credential(&self, id: &str) -> Result<CredentialInfo, RuntimeError> {
        self.wallet
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(RuntimeError::WalletError(format!("unknown credential: {}", id)))
    }
}

#[async_trait]
impl CryptoRuntimeBuilder for FakeRuntime {
    async fn create_key(&self) -> Result<String, RuntimeError> {
        Ok(format!("key-{}", Uuid::new_v4()))
    }

    async fn pack(
        &self,
        message: Vec<u8>,
        recipient_key: String,
        sender_key: Option<String>,
    ) -> Result<Vec<u8>, RuntimeError> {
        let message =
            String::from_utf8(message).map_err(|err| RuntimeError::CryptoError(err.to_string()))?;

        let sealed = json!({
            "recipient": recipient_key,
            "sender": sender_key,
            "message": message,
        });
        Ok(sealed.to_string().into_bytes())
    }

    async fn unpack(
        &self,
        ciphertext: Vec<u8>,
        my_key: String,
    ) -> Result<UnpackedPayload, RuntimeError> {
        let sealed: Value = serde_json::from_slice(&ciphertext)
            .map_err(|err| RuntimeError::CryptoError(err.to_string()))?;

        if sealed["recipient"].as_str() != Some(my_key.as_str()) {
            return Err(RuntimeError::CryptoError(
                "envelope is not addressed to this key".to_string(),
            ));
        }

        Ok(UnpackedPayload {
            message: sealed["message"].as_str().unwrap_or_default().as_bytes().to_vec(),
            sender_key: sealed["sender"].as_str().map(|key| key.to_string()),
        })
    }

    async fn create_credential_offer(&self, cred_def_id: String) -> Result<String, RuntimeError> {
        let schema_id = self
            .schemas_by_definition
            .get(&cred_def_id)
            .ok_or(RuntimeError::WalletError(format!("unknown definition: {}", cred_def_id)))?;

        Ok(json!({
            "schema_id": schema_id,
            "cred_def_id": cred_def_id,
            "nonce": Uuid::new_v4().to_string(),
        })
        .to_string())
    }

    async fn create_credential_request(
        &self,
        prover_key: String,
        offer_json: String,
        cred_def_json: String,
        master_secret_id: String,
    ) -> Result<(String, String), RuntimeError> {
        let offer = parse(&offer_json)?;
        let definition = parse(&cred_def_json)?;
        if offer["cred_def_id"] != definition["id"] {
            return Err(RuntimeError::CryptoError(
                "offer doesn't match the credential definition".to_string(),
            ));
        }

        let request = json!({"prover_did": prover_key, "nonce": offer["nonce"]});
        let metadata = json!({"master_secret_name": master_secret_id});
        Ok((request.to_string(), metadata.to_string()))
    }

    async fn create_credential(
        &self,
        offer_json: String,
        _request_json: String,
        values_json: String,
        rev_reg_id: Option<String>,
        tails: Option<Arc<TailsReader>>,
    ) -> Result<IssuedCredential, RuntimeError> {
        if rev_reg_id.is_some() && tails.map(|reader| reader.is_empty()).unwrap_or(true) {
            return Err(RuntimeError::CryptoError(
                "revocable credential requires a tails file".to_string(),
            ));
        }

        let offer = parse(&offer_json)?;
        let credential = json!({
            "schema_id": offer["schema_id"],
            "cred_def_id": offer["cred_def_id"],
            "rev_reg_id": rev_reg_id,
            "values": parse(&values_json)?,
        });

        let revocable = rev_reg_id.is_some();
        Ok(IssuedCredential {
            credential_json: credential.to_string(),
            revocation_id: revocable.then(|| "1".to_string()),
            revocation_delta_json: revocable.then(|| json!({"issued": [1]}).to_string()),
        })
    }

    async fn store_credential(
        &self,
        _request_metadata_json: String,
        credential_json: String,
        cred_def_json: String,
        _rev_reg_def_json: Option<String>,
    ) -> Result<String, RuntimeError> {
        let credential = parse(&credential_json)?;
        let definition = parse(&cred_def_json)?;

        let attrs: HashMap<String, String> = credential["values"]
            .as_object()
            .map(|values| {
                values
                    .iter()
                    .map(|(name, value)| (name.clone(), value.as_str().unwrap_or_default().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let rev_reg_id = credential["rev_reg_id"].as_str().map(|id| id.to_string());
        let referent = Uuid::new_v4().to_string();
        let info = CredentialInfo {
            referent: referent.clone(),
            attrs,
            schema_id: definition["schemaId"].as_str().unwrap_or_default().to_string(),
            cred_def_id: credential["cred_def_id"].as_str().unwrap_or_default().to_string(),
            cred_rev_id: rev_reg_id.as_ref().map(|_| "1".to_string()),
            rev_reg_id,
        };

        self.wallet.lock().unwrap().insert(referent.clone(), info);
        Ok(referent)
    }

    async fn search_credentials_for_proof_request(
        &self,
        request_json: String,
        referent: String,
    ) -> Result<Vec<CredentialInfo>, RuntimeError> {
        let request = parse(&request_json)?;
        let name = request["requested_attributes"][&referent]["name"]
            .as_str()
            .or(request["requested_predicates"][&referent]["name"].as_str())
            .unwrap_or_default()
            .to_string();

        let wallet = self.wallet.lock().unwrap();
        Ok(wallet
            .values()
            .filter(|info| info.attrs.contains_key(&name))
            .cloned()
            .collect())
    }

    async fn get_credential(&self, credential_id: String) -> Result<CredentialInfo, RuntimeError> {
        self.wallet_credential(&credential_id)
    }

    async fn create_revocation_state(
        &self,
        tails: Arc<TailsReader>,
        _rev_reg_def_json: String,
        rev_reg_delta_json: String,
        timestamp: u64,
        cred_rev_id: String,
    ) -> Result<String, RuntimeError> {
        tails
            .read_at(0, 1)
            .map_err(|err| RuntimeError::CryptoError(err.to_string()))?;

        Ok(json!({
            "timestamp": timestamp,
            "cred_rev_id": cred_rev_id,
            "delta": parse(&rev_reg_delta_json)?,
        })
        .to_string())
    }

    async fn create_proof(
        &self,
        request_json: String,
        requested_credentials_json: String,
        _master_secret_id: String,
        schemas_json: String,
        cred_defs_json: String,
        rev_states_json: String,
    ) -> Result<String, RuntimeError> {
        let request = parse(&request_json)?;
        let requested: RequestedCredentials = serde_json::from_str(&requested_credentials_json)
            .map_err(|err| RuntimeError::CryptoError(err.to_string()))?;
        let schemas = parse(&schemas_json)?;
        let cred_defs = parse(&cred_defs_json)?;
        let rev_states = parse(&rev_states_json)?;

        let mut revealed = Map::new();
        let mut identifiers = Vec::new();
        for (referent, selected) in requested.requested_attributes.iter() {
            let info = self.wallet_credential(&selected.cred_id)?;
            if schemas.get(&info.schema_id).is_none() || cred_defs.get(&info.cred_def_id).is_none() {
                return Err(RuntimeError::CryptoError(
                    "missing ledger objects for the proof".to_string(),
                ));
            }

            if let (Some(rev_reg_id), Some(timestamp)) = (&info.rev_reg_id, selected.timestamp) {
                if rev_states[rev_reg_id][timestamp.to_string()].is_null() {
                    return Err(RuntimeError::CryptoError(
                        "missing revocation state".to_string(),
                    ));
                }
            }

            let name = request["requested_attributes"][referent]["name"]
                .as_str()
                .unwrap_or_default();
            if selected.revealed {
                revealed.insert(
                    referent.clone(),
                    json!({"sub_proof_index": identifiers.len(), "raw": info.attrs.get(name), "encoded": "0"}),
                );
            }

            identifiers.push(json!({
                "schema_id": info.schema_id,
                "cred_def_id": info.cred_def_id,
                "rev_reg_id": info.rev_reg_id,
                "timestamp": selected.timestamp,
            }));
        }

        Ok(json!({
            "nonce": request["nonce"],
            "requested_proof": {"revealed_attrs": revealed},
            "identifiers": identifiers,
        })
        .to_string())
    }

    async fn verify_proof(
        &self,
        request_json: String,
        proof_json: String,
        schemas_json: String,
        cred_defs_json: String,
        rev_reg_defs_json: String,
        rev_regs_json: String,
    ) -> Result<bool, RuntimeError> {
        let request = parse(&request_json)?;
        let proof = parse(&proof_json)?;
        let schemas = parse(&schemas_json)?;
        let cred_defs = parse(&cred_defs_json)?;
        let rev_reg_defs = parse(&rev_reg_defs_json)?;
        let rev_regs = parse(&rev_regs_json)?;

        if proof["nonce"] != request["nonce"] {
            return Ok(false);
        }

        let identifiers = proof["identifiers"].as_array().cloned().unwrap_or_default();
        for identifier in identifiers.iter() {
            let schema_id = identifier["schema_id"].as_str().unwrap_or_default();
            let cred_def_id = identifier["cred_def_id"].as_str().unwrap_or_default();
            if schemas.get(schema_id).is_none() || cred_defs.get(cred_def_id).is_none() {
                return Ok(false);
            }

            if let (Some(rev_reg_id), Some(timestamp)) =
                (identifier["rev_reg_id"].as_str(), identifier["timestamp"].as_u64())
            {
                if rev_reg_defs.get(rev_reg_id).is_none()
                    || rev_regs[rev_reg_id][timestamp.to_string()].is_null()
                {
                    return Ok(false);
                }
            }
        }

        let requested = request["requested_attributes"]
            .as_object()
            .cloned()
            .unwrap_or_default();
        let covered = requested
            .keys()
            .all(|referent| !proof["requested_proof"]["revealed_attrs"][referent].is_null());

        Ok(covered)
    }
}

/// `FakeLedger` is shared by every party, it records the submitted registry entries
#[derive(Clone)]
pub struct FakeLedger {
    tails_location: String,
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeLedger {
    pub fn new(tails_location: String) -> Self {
        Self {
            tails_location,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerBuilder for FakeLedger {
    async fn lookup_schema(&self, schema_id: String) -> Result<Option<String>, RuntimeError> {
        let schema = (schema_id == SCHEMA_ID).then(|| {
            json!({"id": SCHEMA_ID, "name": "person", "version": "1.0", "attrNames": ["first_name", "age"]})
                .to_string()
        });
        Ok(schema)
    }

    async fn lookup_definition(&self, cred_def_id: String) -> Result<Option<String>, RuntimeError> {
        let definition = (cred_def_id == CRED_DEF_ID)
            .then(|| json!({"id": CRED_DEF_ID, "schemaId": SCHEMA_ID, "type": "CL"}).to_string());
        Ok(definition)
    }

    async fn lookup_revocation_registry_definition(
        &self,
        rev_reg_id: String,
    ) -> Result<Option<String>, RuntimeError> {
        let definition = (rev_reg_id == REV_REG_ID).then(|| {
            json!({
                "id": REV_REG_ID,
                "credDefId": CRED_DEF_ID,
                "value": {"tailsHash": TAILS_HASH, "tailsLocation": self.tails_location},
            })
            .to_string()
        });
        Ok(definition)
    }

    async fn lookup_revocation_registry_delta(
        &self,
        rev_reg_id: String,
        _from: Option<u64>,
        to: u64,
    ) -> Result<Option<(String, u64)>, RuntimeError> {
        let delta = (rev_reg_id == REV_REG_ID)
            .then(|| (json!({"value": {"issued": [1], "revoked": []}}).to_string(), to));
        Ok(delta)
    }

    async fn lookup_revocation_registry(
        &self,
        rev_reg_id: String,
        timestamp: u64,
    ) -> Result<Option<(String, u64)>, RuntimeError> {
        let registry = (rev_reg_id == REV_REG_ID)
            .then(|| (json!({"value": {"accum": "accum-1"}}).to_string(), timestamp));
        Ok(registry)
    }

    async fn send_revocation_registry_entry(
        &self,
        rev_reg_id: String,
        delta_json: String,
    ) -> Result<(), RuntimeError> {
        self.entries.lock().unwrap().push((rev_reg_id, delta_json));
        Ok(())
    }
}

/// `CapturingRouter` queues every envelope instead of delivering it
#[derive(Clone, Default)]
pub struct CapturingRouter {
    outbox: Arc<Mutex<VecDeque<(EnvelopeMessage, AgentEndpoint)>>>,
}

impl CapturingRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Option<(EnvelopeMessage, AgentEndpoint)> {
        self.outbox.lock().unwrap().pop_front()
    }

    pub fn pending(&self) -> usize {
        self.outbox.lock().unwrap().len()
    }
}

#[async_trait]
impl RouterBuilder for CapturingRouter {
    async fn forward(
        &self,
        envelope: EnvelopeMessage,
        endpoint: AgentEndpoint,
    ) -> Result<(), MessagingError> {
        self.outbox.lock().unwrap().push_back((envelope, endpoint));
        Ok(())
    }
}

/// `build_agent` writes a configuration file for the party and assembles its agent
pub fn build_agent(
    name: &str,
    workdir: &Path,
    ledger: FakeLedger,
    router: CapturingRouter,
) -> FakeAgent {
    let tails_dir = workdir.join(format!("{}-tails", name));
    let db_dir = workdir.join(format!("{}-db", name));
    let conf_file = workdir.join(format!("{}.toml", name));
    let conf = format!(
        "[agent]\nendpoint = \"{}\"\nmaster_secret_id = \"{}-secret\"\nlabel = \"{}\"\n\n[tails]\npath = \"{}\"\n\n[http]\ntimeout = 5\n\n[db.wallet.common]\npath = \"{}\"\ncf_name = \"wallet\"\n\n[db.wallet.db]\ncreate_if_missing = true\ncreate_missing_columns = true\nset_error_if_exists = false\nset_wal_dir = \"{}\"\n",
        inbox(name),
        name,
        name,
        tails_dir.display(),
        db_dir.join("data").display(),
        db_dir.join("wal").display()
    );
    std::fs::write(&conf_file, conf).unwrap();

    let config = ConfigParser::new(conf_file.display().to_string())
        .parse()
        .unwrap();

    Agent::from_config(&config, FakeRuntime::new(), ledger, router).unwrap()
}

pub fn inbox(name: &str) -> String {
    format!("http://{}.agents.local/inbox", name)
}

/// `deliver` hands every queued envelope to the inbox it was addressed to, until
/// no party has anything left to send
pub async fn deliver(router: &CapturingRouter, parties: &[(&str, &FakeAgent)]) -> Vec<Dispatched> {
    let mut dispatched = Vec::new();

    while let Some((envelope, endpoint)) = router.take() {
        let (_, agent) = parties
            .iter()
            .find(|(name, _)| inbox(name) == endpoint.get_uri())
            .unwrap();

        let result = agent
            .dispatcher()
            .receive_bytes(envelope.to_bytes().unwrap(), endpoint.get_verkey().unwrap())
            .await
            .unwrap();

        dispatched.push(result);
    }

    dispatched
}
