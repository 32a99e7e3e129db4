use std::path::PathBuf;

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde")]
pub struct TailsOptions {
    pub(super) path: String,
}

impl TailsOptions {
    pub fn get_path(&self) -> PathBuf {
        PathBuf::from(self.path.to_owned())
    }
}

impl Default for TailsOptions {
    fn default() -> Self {
        Self {
            path: "./tails".to_string(),
        }
    }
}

impl ToValidate for TailsOptions {
    fn validate(&self) -> Result<(), CommonError> {
        if self.path.trim().is_empty() {
            return Err(CommonError::ValidationError(
                "config: tails:path is missing".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::helpers;

    #[test]
    fn test_validate_path() {
        assert!(helpers::validate(TailsOptions::default()).is_ok());

        let options = TailsOptions {
            path: "".to_string(),
        };
        let validation = helpers::validate(options);
        assert!(validation.unwrap_err().to_string().contains("tails:path"))
    }
}
