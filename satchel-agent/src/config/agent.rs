use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

pub const DEFAULT_MASTER_SECRET_ID: &str = "default_master_secret";

/// `AgentOptions` is the `[agent]` section
///
/// `endpoint` is this agent's own inbox uri, advertised to peers in invitations,
/// requests and responses
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct AgentOptions {
    pub(super) endpoint: String,
    pub(super) master_secret_id: String,

    #[serde(default)]
    pub(super) label: Option<String>,

    #[serde(default)]
    pub(super) image_url: Option<String>,
}

impl AgentOptions {
    pub fn get_endpoint(&self) -> String {
        self.endpoint.to_owned()
    }

    pub fn get_master_secret_id(&self) -> String {
        self.master_secret_id.to_owned()
    }

    pub fn get_owner(&self) -> (Option<String>, Option<String>) {
        (self.label.to_owned(), self.image_url.to_owned())
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            endpoint: "".to_string(),
            master_secret_id: DEFAULT_MASTER_SECRET_ID.to_string(),
            label: None,
            image_url: None,
        }
    }
}

impl ToValidate for AgentOptions {
    fn validate(&self) -> Result<(), CommonError> {
        if self.endpoint.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:endpoint is missing".to_string(),
            ));
        }

        if self.master_secret_id.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: agent:master_secret_id is missing".to_string(),
            ));
        }

        Ok(())
    }
}
