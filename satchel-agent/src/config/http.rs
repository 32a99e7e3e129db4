use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

/// `HttpOptions` is the `[http]` section, `timeout` is given in seconds and
/// bounds every outgoing HTTP call
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct HttpOptions {
    pub(super) timeout: u64,
}

impl HttpOptions {
    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self { timeout: 30 }
    }
}

impl ToValidate for HttpOptions {
    fn validate(&self) -> Result<(), CommonError> {
        if self.timeout == 0 {
            return Err(CommonError::ValidationError(
                "config: http:timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
