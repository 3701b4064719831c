//! Ticket validation round trip.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CasConfig;
use crate::error::{CasError, CasResult};
use crate::protocol::{ProtocolAdapter, ProtocolVersion, RequestMethod, ValidationOutcome};

/// Exchanges service tickets with the CAS server.
///
/// One HTTP request per call, no retries. The response body is fully
/// buffered before being handed to the protocol adapter.
pub struct TicketValidator {
    /// CAS base URL without a trailing slash.
    cas_base: String,
    adapter: Box<dyn ProtocolAdapter>,
    http_client: reqwest::Client,
}

impl TicketValidator {
    /// Create a validator for the configured CAS server and protocol version.
    pub fn new(config: &CasConfig) -> CasResult<Self> {
        let parsed = Url::parse(&config.cas_url)
            .map_err(|e| CasError::Configuration(format!("Invalid cas_url: {}", e)))?;
        if parsed.host_str().is_none() {
            return Err(CasError::Configuration(
                "cas_url must include a host".to_string(),
            ));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.validation_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| CasError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            cas_base: config.cas_base().to_string(),
            adapter: config.cas_version.adapter(),
            http_client,
        })
    }

    pub fn version(&self) -> ProtocolVersion {
        self.adapter.version()
    }

    /// Full URL of the validation endpoint, without query.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.cas_base, self.version().validate_path())
    }

    /// Validate `ticket` against the service URL it was issued for.
    ///
    /// Protocol rejections come back as [`ValidationOutcome::Failure`];
    /// only transport failures are errors.
    pub async fn validate(&self, ticket: &str, service_url: &str) -> CasResult<ValidationOutcome> {
        let request = self.adapter.build_request(service_url, ticket);
        let url = format!("{}?{}", self.endpoint(), request.query_string());

        debug!(
            url = %url,
            version = %self.version(),
            "Validating CAS ticket"
        );

        let builder = match request.method {
            RequestMethod::Get => self.http_client.get(&url),
            RequestMethod::Post => self.http_client.post(&url),
        };
        let builder = match request.body {
            Some((body, content_type)) => builder
                .header(CONTENT_TYPE, content_type)
                .header(CONTENT_LENGTH, body.len())
                .body(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, url = %url, "CAS validation request failed");
            CasError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            warn!(error = %e, "Failed to read CAS validation response");
            CasError::Network(e.to_string())
        })?;

        if !status.is_success() {
            debug!(status = %status, "CAS validation endpoint returned non-success status");
        }

        let outcome = self.adapter.parse_response(&body);
        match &outcome {
            ValidationOutcome::Success { identity, attributes } => info!(
                user = %identity,
                attributes = attributes.len(),
                "CAS ticket validated"
            ),
            ValidationOutcome::Failure { reason } => info!(reason = %reason, "CAS ticket rejected"),
        }

        Ok(outcome)
    }
}
