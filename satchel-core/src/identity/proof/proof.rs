use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::types::{
    ProofEntityAccessor, ProofError, ProofRequestEntityAccessor, ProofState, RequestState, Role,
};

/// `ProofRequestRecord` is kept by both the requester and the prover
///
/// The requester's record id is used as the `thread_id` on both sides
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRequestRecord {
    pub(crate) id: String,

    #[serde(rename = "connectionId")]
    pub(crate) connection_id: String,

    #[serde(rename = "threadId")]
    pub(crate) thread_id: String,

    pub(crate) role: Role,
    pub(crate) state: RequestState,

    #[serde(rename = "requestJson")]
    pub(crate) request_json: String,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl ProofRequestRecord {
    /// `requested` builds the requester side record, its own id is the thread id
    pub fn requested(connection_id: String, request_json: String) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            id: id.clone(),
            connection_id,
            thread_id: id,
            role: Role::Requester,
            state: RequestState::Requested,
            request_json,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn received(connection_id: String, thread_id: String, request_json: String) -> Self {
        let mut record = Self::requested(connection_id, request_json);
        record.thread_id = thread_id;
        record.role = Role::Prover;
        record
    }

    pub fn transition(&mut self, next: RequestState) -> Result<(), ProofError> {
        if !self.state.can_advance_to(&next) {
            return Err(ProofError::ProtocolStateError(format!(
                "proof request {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn ensure(&self, role: Role, state: RequestState) -> Result<(), ProofError> {
        if self.role != role || self.state != state {
            return Err(ProofError::ProtocolStateError(format!(
                "proof request {} expected {:?} on {}, current: {:?} on {}",
                self.id,
                role,
                state.as_str(),
                self.role,
                self.state.as_str()
            )));
        }

        Ok(())
    }
}

impl ToJSON for ProofRequestRecord {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for ProofRequestRecord {
    type Error = ProofError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| ProofError::EntityError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for ProofRequestRecord {
    type Error = ProofError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|err| ProofError::EntityError(err.to_string()))
    }
}

impl ProofRequestEntityAccessor for ProofRequestRecord {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_connection_id(&self) -> String {
        self.connection_id.to_owned()
    }

    fn get_thread_id(&self) -> String {
        self.thread_id.to_owned()
    }

    fn get_role(&self) -> Role {
        self.role.to_owned()
    }

    fn get_state(&self) -> RequestState {
        self.state.to_owned()
    }

    fn get_request_json(&self) -> String {
        self.request_json.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// `ProofRecord` is a proof received by the requester
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRecord {
    pub(crate) id: String,

    #[serde(rename = "proofRequestId")]
    pub(crate) proof_request_id: String,

    #[serde(rename = "connectionId")]
    pub(crate) connection_id: String,

    pub(crate) state: ProofState,

    #[serde(rename = "proofJson")]
    pub(crate) proof_json: String,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl ProofRecord {
    pub fn new(proof_request_id: String, connection_id: String, proof_json: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            proof_request_id,
            connection_id,
            state: ProofState::Proposed,
            proof_json,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, next: ProofState) -> Result<(), ProofError> {
        if !self.state.can_advance_to(&next) {
            return Err(ProofError::ProtocolStateError(format!(
                "proof {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// `revealed_attribute` returns the cleartext value revealed for the referent
    pub fn revealed_attribute(&self, referent: &str) -> Option<String> {
        let proof: Value = serde_json::from_str(&self.proof_json).ok()?;
        proof
            .get("requested_proof")?
            .get("revealed_attrs")?
            .get(referent)?
            .get("raw")?
            .as_str()
            .map(|raw| raw.to_string())
    }

    /// `identifiers` lists the ledger objects the proof was built against
    pub fn identifiers(&self) -> Result<Vec<ProofIdentifier>, ProofError> {
        let proof: Value = serde_json::from_str(&self.proof_json)
            .map_err(|err| ProofError::JSONError(err.to_string()))?;

        let identifiers = proof
            .get("identifiers")
            .cloned()
            .ok_or(ProofError::ValidationError(
                "proof identifiers were missing".to_string(),
            ))?;

        serde_json::from_value(identifiers).map_err(|err| ProofError::JSONError(err.to_string()))
    }
}

/// `ProofIdentifier` is a single entry of the proof's `identifiers` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofIdentifier {
    pub schema_id: String,
    pub cred_def_id: String,

    #[serde(default)]
    pub rev_reg_id: Option<String>,

    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl ToJSON for ProofRecord {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for ProofRecord {
    type Error = ProofError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| ProofError::EntityError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for ProofRecord {
    type Error = ProofError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|err| ProofError::EntityError(err.to_string()))
    }
}

impl ProofEntityAccessor for ProofRecord {
    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_proof_request_id(&self) -> String {
        self.proof_request_id.to_owned()
    }

    fn get_connection_id(&self) -> String {
        self.connection_id.to_owned()
    }

    fn get_state(&self) -> ProofState {
        self.state.to_owned()
    }

    fn get_proof_json(&self) -> String {
        self.proof_json.to_owned()
    }

    fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROOF_JSON: &str = r#"{
        "requested_proof": {
            "revealed_attrs": {
                "first-name": {"sub_proof_index": 0, "raw": "Alice", "encoded": "1139481716457488690172217916278103335"}
            }
        },
        "identifiers": [
            {"schema_id": "schema-1", "cred_def_id": "cred-def-1", "rev_reg_id": null, "timestamp": null},
            {"schema_id": "schema-2", "cred_def_id": "cred-def-2", "rev_reg_id": "rev-reg-1", "timestamp": 1700000000}
        ]
    }"#;

    #[test]
    fn test_received_request() {
        let record = ProofRequestRecord::received(
            "local-conn-1".to_string(),
            "thread-1".to_string(),
            "{}".to_string(),
        );

        assert_eq!(record.get_role(), Role::Prover);
        assert_eq!(record.get_thread_id(), "thread-1".to_string());
        assert_ne!(record.get_id(), record.get_thread_id())
    }

    #[test]
    fn test_request_rejected_is_final() {
        let mut record = ProofRequestRecord::requested("local-conn-1".to_string(), "{}".to_string());
        assert!(record.transition(RequestState::Rejected).is_ok());

        let accept = record.transition(RequestState::Accepted);
        assert!(matches!(
            accept.unwrap_err(),
            ProofError::ProtocolStateError(_)
        ))
    }

    #[test]
    fn test_revealed_attribute() {
        let proof = ProofRecord::new(
            "request-1".to_string(),
            "local-conn-1".to_string(),
            PROOF_JSON.to_string(),
        );

        assert_eq!(
            proof.revealed_attribute("first-name"),
            Some("Alice".to_string())
        );
        assert_eq!(proof.revealed_attribute("unknown"), None)
    }

    #[test]
    fn test_identifiers() {
        let proof = ProofRecord::new(
            "request-1".to_string(),
            "local-conn-1".to_string(),
            PROOF_JSON.to_string(),
        );

        let identifiers = proof.identifiers().unwrap();
        assert_eq!(identifiers.len(), 2);
        assert_eq!(identifiers[0].rev_reg_id, None);
        assert_eq!(identifiers[1].timestamp, Some(1700000000));

        let invalid = ProofRecord::new(
            "request-1".to_string(),
            "local-conn-1".to_string(),
            "{}".to_string(),
        );
        assert!(matches!(
            invalid.identifiers().unwrap_err(),
            ProofError::ValidationError(_)
        ))
    }

    #[test]
    fn test_build_json_bytes() {
        let proof = ProofRecord::new(
            "request-1".to_string(),
            "local-conn-1".to_string(),
            PROOF_JSON.to_string(),
        );
        assert!(!proof.to_json().is_err());

        let bytes: Result<Vec<u8>, ProofError> = proof.clone().try_into();
        let decoded = ProofRecord::try_from(bytes.unwrap()).unwrap();
        assert_eq!(decoded.get_id(), proof.get_id());
        assert_eq!(decoded.get_state(), ProofState::Proposed)
    }
}
