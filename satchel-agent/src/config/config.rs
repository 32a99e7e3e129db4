use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{AgentOptions, Database, HttpOptions, TailsOptions};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct Config {
    pub(super) agent: AgentOptions,

    #[serde(default)]
    pub(super) tails: TailsOptions,

    #[serde(default)]
    pub(super) http: HttpOptions,

    #[serde(default)]
    pub(super) db: Database,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&self) -> &AgentOptions {
        &self.agent
    }

    pub fn tails(&self) -> &TailsOptions {
        &self.tails
    }

    pub fn http(&self) -> &HttpOptions {
        &self.http
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentOptions::default(),
            tails: TailsOptions::default(),
            http: HttpOptions::default(),
            db: Database::default(),
        }
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        _ = self.agent.validate()?;
        _ = self.tails.validate()?;
        _ = self.http.validate()?;
        _ = self.db.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::helpers;
    use crate::common::types::CommonError;

    #[test]
    fn test_validation_failed() {
        let cfg = Config::default();
        let validation = helpers::validate(cfg);
        assert!(validation.is_err());
        assert!(matches!(
            validation.unwrap_err(),
            CommonError::ValidationError(_)
        ))
    }

    #[test]
    fn test_validation_names_section() {
        let mut cfg = Config::default();
        cfg.agent.endpoint = "http://localhost:7000/inbox".to_string();
        cfg.http.timeout = 0;

        let validation = helpers::validate(cfg);
        assert!(validation.unwrap_err().to_string().contains("http:timeout"))
    }

    #[test]
    fn test_validation_covers_db() {
        let mut cfg = Config::default();
        cfg.agent.endpoint = "http://localhost:7000/inbox".to_string();
        cfg.db.wallet.common.cf_name = "".to_string();

        let validation = helpers::validate(cfg);
        assert!(validation
            .unwrap_err()
            .to_string()
            .contains("rocksdbcommon:cf_name"))
    }
}
