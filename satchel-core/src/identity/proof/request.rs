use std::collections::HashMap;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use super::types::ProofError;

/// `AttributeFilter` restricts which credentials may satisfy a requested item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(crate = "self::serde")]
pub struct AttributeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofAttributeInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<AttributeFilter>>,
}

impl ProofAttributeInfo {
    pub fn new(name: String) -> Self {
        Self {
            name,
            restrictions: None,
        }
    }
}

/// `ProofPredicateInfo` asks to prove `name p_type p_value` without revealing the value,
/// e.g. `age >= 18`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofPredicateInfo {
    pub name: String,
    pub p_type: String,
    pub p_value: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<AttributeFilter>>,
}

/// `ProofRequest` is what a verifier asks a prover to prove
///
/// Requested items are keyed by a referent chosen by the verifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(crate = "self::serde")]
pub struct ProofRequest {
    pub name: String,
    pub version: String,
    pub nonce: String,

    #[serde(default)]
    pub requested_attributes: HashMap<String, ProofAttributeInfo>,

    #[serde(default)]
    pub requested_predicates: HashMap<String, ProofPredicateInfo>,
}

impl ProofRequest {
    pub fn validate(&self) -> Result<(), ProofError> {
        if self.nonce.trim().is_empty() {
            return Err(ProofError::ValidationError(
                "proof request nonce was missing".to_string(),
            ));
        }

        if self.requested_attributes.is_empty() && self.requested_predicates.is_empty() {
            return Err(ProofError::ValidationError(
                "proof request has nothing to prove".to_string(),
            ));
        }

        Ok(())
    }

    pub fn has_referent(&self, referent: &str) -> bool {
        self.requested_attributes.contains_key(referent)
            || self.requested_predicates.contains_key(referent)
    }

    /// `ensure_covered` checks every requested referent is answered by the prover's selection
    pub fn ensure_covered(&self, requested: &RequestedCredentials) -> Result<(), ProofError> {
        let mut missing: Vec<&String> = self
            .requested_attributes
            .keys()
            .filter(|referent| {
                !requested.requested_attributes.contains_key(*referent)
                    && !requested.self_attested_attributes.contains_key(*referent)
            })
            .chain(
                self.requested_predicates
                    .keys()
                    .filter(|referent| !requested.requested_predicates.contains_key(*referent)),
            )
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        missing.sort();
        Err(ProofError::ValidationError(format!(
            "requested referents are not satisfied: {:?}",
            missing
        )))
    }

    pub fn to_json(&self) -> Result<String, ProofError> {
        serde_json::to_string(self).map_err(|err| ProofError::JSONError(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ProofError> {
        serde_json::from_str(json).map_err(|err| ProofError::JSONError(err.to_string()))
    }
}

/// `RequestedAttribute` binds a referent to a credential held in the wallet
///
/// When `timestamp` is given for a revocable credential, non-revocation is proven
/// at that point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestedAttribute {
    pub cred_id: String,

    #[serde(default)]
    pub revealed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// `RequestedCredentials` is the prover's selection answering a [`ProofRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(crate = "self::serde")]
pub struct RequestedCredentials {
    #[serde(default)]
    pub self_attested_attributes: HashMap<String, String>,

    #[serde(default)]
    pub requested_attributes: HashMap<String, RequestedAttribute>,

    #[serde(default)]
    pub requested_predicates: HashMap<String, RequestedAttribute>,
}

impl RequestedCredentials {
    /// Every wallet credential referenced by the selection together with its timestamp
    pub fn selected(&self) -> Vec<RequestedAttribute> {
        self.requested_attributes
            .values()
            .chain(self.requested_predicates.values())
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ProofError> {
        serde_json::to_string(self).map_err(|err| ProofError::JSONError(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_request() -> ProofRequest {
        let mut request = ProofRequest {
            name: "proof-req".to_string(),
            version: "1.0".to_string(),
            nonce: "123".to_string(),
            ..Default::default()
        };

        request.requested_attributes.insert(
            "first-name".to_string(),
            ProofAttributeInfo::new("first_name".to_string()),
        );
        request.requested_predicates.insert(
            "adult".to_string(),
            ProofPredicateInfo {
                name: "age".to_string(),
                p_type: ">=".to_string(),
                p_value: 18,
                restrictions: None,
            },
        );
        request
    }

    fn selection(cred_id: &str) -> RequestedAttribute {
        RequestedAttribute {
            cred_id: cred_id.to_string(),
            revealed: true,
            timestamp: None,
        }
    }

    #[test]
    fn test_validate() {
        assert!(generate_request().validate().is_ok());

        let mut request = generate_request();
        request.nonce = "".to_string();
        assert!(matches!(
            request.validate().unwrap_err(),
            ProofError::ValidationError(_)
        ));

        let empty = ProofRequest {
            nonce: "123".to_string(),
            ..Default::default()
        };
        assert!(empty.validate().is_err())
    }

    #[test]
    fn test_ensure_covered() {
        let request = generate_request();

        let mut requested = RequestedCredentials::default();
        requested
            .requested_attributes
            .insert("first-name".to_string(), selection("cred-1"));
        assert!(request.ensure_covered(&requested).is_err());

        requested
            .requested_predicates
            .insert("adult".to_string(), selection("cred-1"));
        assert!(request.ensure_covered(&requested).is_ok());
        assert_eq!(requested.selected().len(), 2)
    }

    #[test]
    fn test_self_attested_covers_attribute() {
        let mut request = generate_request();
        request.requested_predicates.clear();

        let mut requested = RequestedCredentials::default();
        requested
            .self_attested_attributes
            .insert("first-name".to_string(), "Alice".to_string());
        assert!(request.ensure_covered(&requested).is_ok())
    }

    #[test]
    fn test_request_json_fields() {
        let json = generate_request().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value["requested_attributes"]["first-name"]["name"],
            serde_json::json!("first_name")
        );
        assert_eq!(
            value["requested_predicates"]["adult"]["p_value"],
            serde_json::json!(18)
        );
        assert!(value["requested_attributes"]["first-name"]
            .get("restrictions")
            .is_none());

        let decoded = ProofRequest::from_json(&json).unwrap();
        assert_eq!(decoded, generate_request())
    }
}
