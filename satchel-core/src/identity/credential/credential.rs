use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use super::types::{CredentialEntityAccessor, CredentialError, Role, State};

/// `Credential` is a single credential exchange record
///
/// On the issuer side the `thread_id` equals the record id. On the holder side it
/// is the issuer's record id taken from the offer message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Credential {
    pub(crate) id: String,

    #[serde(rename = "connectionId")]
    pub(crate) connection_id: String,

    #[serde(rename = "threadId")]
    pub(crate) thread_id: String,

    pub(crate) role: Role,
    pub(crate) state: State,

    #[serde(rename = "schemaId")]
    pub(crate) schema_id: String,

    #[serde(rename = "credDefId")]
    pub(crate) cred_def_id: String,

    #[serde(rename = "offerJson")]
    pub(crate) offer_json: String,

    #[serde(rename = "valuesJson")]
    pub(crate) values_json: Option<String>,

    #[serde(rename = "requestJson")]
    pub(crate) request_json: Option<String>,

    #[serde(rename = "requestMetadataJson")]
    pub(crate) request_metadata_json: Option<String>,

    #[serde(rename = "credentialJson")]
    pub(crate) credential_json: Option<String>,

    #[serde(rename = "credentialReferent")]
    pub(crate) credential_referent: Option<String>,

    pub(crate) revocable: bool,

    #[serde(rename = "revocationRegistryId")]
    pub(crate) revocation_registry_id: Option<String>,

    #[serde(rename = "revocationId")]
    pub(crate) revocation_id: Option<String>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Credential {
    fn new(
        connection_id: String,
        role: Role,
        schema_id: String,
        cred_def_id: String,
        offer_json: String,
    ) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            id: id.clone(),
            connection_id,
            thread_id: id,
            role,
            state: State::Offered,
            schema_id,
            cred_def_id,
            offer_json,
            values_json: None,
            request_json: None,
            request_metadata_json: None,
            credential_json: None,
            credential_referent: None,
            revocable: false,
            revocation_registry_id: None,
            revocation_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// `offer` builds the issuer side record of a new offer
    pub fn offer(
        connection_id: String,
        schema_id: String,
        cred_def_id: String,
        offer_json: String,
        values_json: String,
        revocation_registry_id: Option<String>,
    ) -> Self {
        let mut credential = Self::new(connection_id, Role::Issuer, schema_id, cred_def_id, offer_json);
        credential.values_json = Some(values_json);
        credential.revocable = revocation_registry_id.is_some();
        credential.revocation_registry_id = revocation_registry_id;
        credential
    }

    /// `received` builds the holder side record of an incoming offer
    pub fn received(
        connection_id: String,
        thread_id: String,
        schema_id: String,
        cred_def_id: String,
        offer_json: String,
    ) -> Self {
        let mut credential = Self::new(connection_id, Role::Holder, schema_id, cred_def_id, offer_json);
        credential.thread_id = thread_id;
        credential
    }

    pub fn transition(&mut self, next: State) -> Result<(), CredentialError> {
        if !self.state.can_advance_to(&next) {
            return Err(CredentialError::ProtocolStateError(format!(
                "credential {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }

        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn ensure(&self, role: Role, state: State) -> Result<(), CredentialError> {
        if self.role != role {
            return Err(CredentialError::ProtocolStateError(format!(
                "credential {} is not owned by the {:?} role",
                self.id, role
            )));
        }

        if self.state != state {
            return Err(CredentialError::ProtocolStateError(format!(
                "credential {} expected to be {}, current state: {}",
                self.id,
                state.as_str(),
                self.state.as_str()
            )));
        }

        Ok(())
    }

    pub fn set_request(&mut self, request_json: String, request_metadata_json: Option<String>) {
        self.request_json = Some(request_json);
        self.request_metadata_json = request_metadata_json;
    }

    pub fn set_issued(&mut self, credential_json: String, revocation_id: Option<String>) {
        self.credential_json = Some(credential_json);
        self.revocation_id = revocation_id;
    }

    pub fn set_stored(
        &mut self,
        credential_json: String,
        referent: String,
        revocation_registry_id: Option<String>,
    ) {
        self.credential_json = Some(credential_json);
        self.credential_referent = Some(referent);
        self.revocable = revocation_registry_id.is_some();
        self.revocation_registry_id = revocation_registry_id;
    }
}

/// `CredentialIdentifiers` are the ledger identifiers embedded in an offer or a credential
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialIdentifiers {
    pub schema_id: String,
    pub cred_def_id: String,
    pub rev_reg_id: Option<String>,
}

impl CredentialIdentifiers {
    pub fn parse(json: &str) -> Result<Self, CredentialError> {
        let value: Value =
            serde_json::from_str(json).map_err(|err| CredentialError::JSONError(err.to_string()))?;

        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .filter(|val| !val.is_empty())
                .map(|val| val.to_string())
        };

        let schema_id = field("schema_id").ok_or(CredentialError::ValidationError(
            "schema_id was missing".to_string(),
        ))?;

        let cred_def_id = field("cred_def_id").ok_or(CredentialError::ValidationError(
            "cred_def_id was missing".to_string(),
        ))?;

        Ok(Self {
            schema_id,
            cred_def_id,
            rev_reg_id: field("rev_reg_id"),
        })
    }
}

impl ToJSON for Credential {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|err| BaseError::ToJSONError(err.to_string()))
    }
}

impl TryInto<Vec<u8>> for Credential {
    type Error = CredentialError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|err| CredentialError::EntityError(err.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Credential {
    type Error = CredentialError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|err| CredentialError::EntityError(err.to_string()))
    }
}

impl CredentialEntityAccessor for Credential {
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

    fn get_state(&self) -> State {
        self.state.to_owned()
    }

    fn get_schema_id(&self) -> String {
        self.schema_id.to_owned()
    }

    fn get_cred_def_id(&self) -> String {
        self.cred_def_id.to_owned()
    }

    fn get_offer_json(&self) -> String {
        self.offer_json.to_owned()
    }

    fn get_values_json(&self) -> Option<String> {
        self.values_json.to_owned()
    }

    fn get_request_json(&self) -> Option<String> {
        self.request_json.to_owned()
    }

    fn get_request_metadata_json(&self) -> Option<String> {
        self.request_metadata_json.to_owned()
    }

    fn get_credential_json(&self) -> Option<String> {
        self.credential_json.to_owned()
    }

    fn get_credential_referent(&self) -> Option<String> {
        self.credential_referent.to_owned()
    }

    fn is_revocable(&self) -> bool {
        self.revocable
    }

    fn get_revocation_registry_id(&self) -> Option<String> {
        self.revocation_registry_id.to_owned()
    }

    fn get_revocation_id(&self) -> Option<String> {
        self.revocation_id.to_owned()
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

    fn generate_offer(revocation_registry_id: Option<String>) -> Credential {
        Credential::offer(
            "connection-1".to_string(),
            "schema-1".to_string(),
            "cred-def-1".to_string(),
            r#"{"schema_id": "schema-1", "cred_def_id": "cred-def-1"}"#.to_string(),
            r#"{"first_name": "Test"}"#.to_string(),
            revocation_registry_id,
        )
    }

    #[test]
    fn test_offer_thread_is_own_id() {
        let credential = generate_offer(None);
        assert_eq!(credential.get_thread_id(), credential.get_id());
        assert_eq!(credential.get_role(), Role::Issuer);
        assert_eq!(credential.get_state(), State::Offered);
        assert!(!credential.is_revocable())
    }

    #[test]
    fn test_offer_revocable() {
        let credential = generate_offer(Some("rev-reg-1".to_string()));
        assert!(credential.is_revocable());
        assert_eq!(
            credential.get_revocation_registry_id(),
            Some("rev-reg-1".to_string())
        )
    }

    #[test]
    fn test_transition_forward_only() {
        let mut credential = generate_offer(None);

        let skip = credential.transition(State::Issued);
        assert!(matches!(
            skip.unwrap_err(),
            CredentialError::ProtocolStateError(_)
        ));

        assert!(credential.transition(State::Requested).is_ok());
        assert!(credential.transition(State::Issued).is_ok());

        let regress = credential.transition(State::Requested);
        assert!(regress.is_err())
    }

    #[test]
    fn test_ensure_role_and_state() {
        let credential = generate_offer(None);
        assert!(credential.ensure(Role::Issuer, State::Offered).is_ok());
        assert!(credential.ensure(Role::Holder, State::Offered).is_err());
        assert!(credential.ensure(Role::Issuer, State::Requested).is_err())
    }

    #[test]
    fn test_parse_identifiers() {
        let ids = CredentialIdentifiers::parse(
            r#"{"schema_id": "schema-1", "cred_def_id": "cred-def-1", "rev_reg_id": null}"#,
        )
        .unwrap();
        assert_eq!(ids.schema_id, "schema-1".to_string());
        assert_eq!(ids.rev_reg_id, None);

        let ids = CredentialIdentifiers::parse(
            r#"{"schema_id": "schema-1", "cred_def_id": "cred-def-1", "rev_reg_id": "rev-reg-1"}"#,
        )
        .unwrap();
        assert_eq!(ids.rev_reg_id, Some("rev-reg-1".to_string()));

        let missing = CredentialIdentifiers::parse(r#"{"schema_id": "schema-1"}"#);
        assert!(matches!(
            missing.unwrap_err(),
            CredentialError::ValidationError(_)
        ))
    }

    #[test]
    fn test_build_json_bytes() {
        let credential = generate_offer(Some("rev-reg-1".to_string()));
        assert!(!credential.to_json().is_err());

        let bytes: Result<Vec<u8>, CredentialError> = credential.clone().try_into();
        let decoded = Credential::try_from(bytes.unwrap()).unwrap();
        assert_eq!(decoded.get_id(), credential.get_id());
        assert_eq!(decoded.get_offer_json(), credential.get_offer_json())
    }
}
