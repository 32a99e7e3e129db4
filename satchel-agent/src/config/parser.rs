use rstdev_config::format::use_toml;
use rstdev_config::parser::from_file;
use rstdev_config::{types::ConfigError, Builder};

use super::Config;

pub struct Parser {
    conf_file: String,
}

impl Parser {
    pub fn new(conf_file: String) -> Self {
        Self { conf_file }
    }

    pub fn parse(&self) -> Result<Config, ConfigError> {
        let config_toml = {
            let config_builder: Result<Config, ConfigError> =
                Builder::new(from_file(self.conf_file.to_owned()))
                    .fetch()?
                    .parse(use_toml);

            config_builder
        };

        config_toml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;
    use std::time::Duration;

    use crate::common::helpers;

    fn fixture(name: &str) -> String {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("src/config/fixtures");
        format!("{}/{}", path.display(), name)
    }

    #[test]
    fn test_parse_config() {
        let parser = Parser::new(fixture("config.toml"));
        let config_builder = parser.parse();

        assert!(!config_builder.is_err());

        let config = config_builder.unwrap();
        assert_eq!(
            config.agent().get_endpoint(),
            "http://localhost:7000/inbox".to_string()
        );
        assert_eq!(
            config.agent().get_master_secret_id(),
            "alice-secret".to_string()
        );
        assert_eq!(
            config.tails().get_path(),
            PathBuf::from("./alice-tails")
        );
        assert_eq!(config.http().get_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.db().wallet.get_common().get(),
            ("./alice-db".to_string(), "wallet".to_string())
        );
        assert!(helpers::validate(config).is_ok())
    }

    #[test]
    fn test_parse_config_section_defaults() {
        let parser = Parser::new(fixture("config_minimal.toml"));
        let config = parser.parse().unwrap();

        assert_eq!(config.tails().get_path(), PathBuf::from("./tails"));
        assert_eq!(config.http().get_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.db().wallet.get_db_options().get_set_wal_dir(),
            "./db/wal".to_string()
        );
    }

    #[test]
    fn test_parse_config_invalid() {
        let parser = Parser::new(fixture("config_invalid.toml"));
        let config = parser.parse().unwrap();

        let validation = helpers::validate(config);
        assert!(validation.unwrap_err().to_string().contains("tails:path"))
    }

    #[test]
    fn test_parse_missing_file() {
        let parser = Parser::new(fixture("unknown.toml"));
        assert!(parser.parse().is_err())
    }
}
