mod agent;
pub use agent::AgentOptions;

mod tails;
pub use tails::TailsOptions;

mod http;
pub use http::HttpOptions;

mod database;
pub use database::{Database, RocksDBCommon, RocksDBOptions, Wallet};

mod config;
pub use config::Config;

mod parser;
pub use parser::Parser;
