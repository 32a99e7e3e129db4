use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, warn};

use satchel_core::messaging::types::RouterBuilder;
use satchel_core::messaging::{AgentEndpoint, EnvelopeMessage, MessagingError};

use crate::config::Config;

const ENVELOPE_CONTENT_TYPE: &str = "application/octet-stream";

/// `HttpRouter` delivers envelopes with a single HTTP POST to the peer inbox
///
/// Every call is bounded by the client timeout, a failed delivery is returned
/// to the caller as is
#[derive(Clone)]
pub struct HttpRouter {
    client: Client,
}

impl HttpRouter {
    pub fn new(timeout: Duration) -> Result<Self, MessagingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| MessagingError::TransportError(err.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self, MessagingError> {
        Self::new(config.http().get_timeout())
    }
}

#[async_trait]
impl RouterBuilder for HttpRouter {
    async fn forward(
        &self,
        envelope: EnvelopeMessage,
        endpoint: AgentEndpoint,
    ) -> Result<(), MessagingError> {
        let uri = endpoint.get_uri();
        let body = envelope.to_bytes()?;

        debug!(
            "[router:forward] delivering {} to {}",
            envelope.get_type(),
            uri
        );

        let response = self
            .client
            .post(uri.as_str())
            .header(CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| MessagingError::TransportError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("[router:forward] {} responded with {}", uri, status);
            return Err(MessagingError::TransportError(format!(
                "{} responded with {}",
                uri, status
            )));
        }

        Ok(())
    }
}
