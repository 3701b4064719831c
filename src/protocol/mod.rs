//! CAS protocol adapters.
//!
//! Each supported protocol version gets one adapter that knows its
//! validation endpoint, how to build the validation request and how to turn
//! the raw response body into a [`ValidationOutcome`].

pub mod saml;
pub mod service;
pub mod v1;
mod xml;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub use saml::Saml11Adapter;
pub use service::ServiceValidateAdapter;
pub use v1::V1Adapter;

/// Generic failure message for rejected or structurally unexpected responses.
pub const AUTH_FAILED: &str = "CAS authentication failed.";

/// Failure message for responses that cannot be parsed at all.
pub const BAD_RESPONSE: &str = "Response from CAS server was bad.";

/// Supported CAS protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "1.0")]
    V1,
    #[serde(rename = "2.0")]
    V2,
    #[serde(rename = "3.0")]
    V3,
    #[serde(rename = "saml1.1")]
    Saml11,
}

impl ProtocolVersion {
    /// Validation endpoint path, relative to the CAS base URL.
    pub fn validate_path(&self) -> &'static str {
        match self {
            ProtocolVersion::V1 => "/validate",
            ProtocolVersion::V2 => "/serviceValidate",
            ProtocolVersion::V3 => "/p3/serviceValidate",
            ProtocolVersion::Saml11 => "/samlValidate",
        }
    }

    /// Build the adapter for this version.
    pub fn adapter(&self) -> Box<dyn ProtocolAdapter> {
        match self {
            ProtocolVersion::V1 => Box::new(V1Adapter),
            ProtocolVersion::V2 | ProtocolVersion::V3 => Box::new(ServiceValidateAdapter::new(*self)),
            ProtocolVersion::Saml11 => Box::new(Saml11Adapter),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1.0" | "1" => Ok(ProtocolVersion::V1),
            "2.0" | "2" => Ok(ProtocolVersion::V2),
            "3.0" | "3" => Ok(ProtocolVersion::V3),
            "saml1.1" => Ok(ProtocolVersion::Saml11),
            other => Err(format!("Unsupported CAS version: {}", other)),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "1.0"),
            ProtocolVersion::V2 => write!(f, "2.0"),
            ProtocolVersion::V3 => write!(f, "3.0"),
            ProtocolVersion::Saml11 => write!(f, "saml1.1"),
        }
    }
}

/// An attribute released by the CAS server. Multi-valued attributes keep
/// document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Build from collected values: one value stays scalar.
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            AttributeValue::Single(values.remove(0))
        } else {
            AttributeValue::Multiple(values)
        }
    }

    /// First value, if any.
    pub fn first(&self) -> Option<&str> {
        match self {
            AttributeValue::Single(s) => Some(s),
            AttributeValue::Multiple(v) => v.first().map(String::as_str),
        }
    }
}

pub type Attributes = HashMap<String, AttributeValue>;

/// Result of exchanging a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Success {
        identity: String,
        attributes: Attributes,
    },
    Failure {
        reason: String,
    },
}

impl ValidationOutcome {
    pub fn success(identity: impl Into<String>, attributes: Attributes) -> Self {
        ValidationOutcome::Success {
            identity: identity.into(),
            attributes,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ValidationOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success { .. })
    }
}

/// HTTP method of a validation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

/// Version-specific shape of the outgoing validation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub method: RequestMethod,
    /// Query parameters, unencoded.
    pub query: Vec<(&'static str, String)>,
    /// Request body and its content type.
    pub body: Option<(String, &'static str)>,
}

impl ValidationRequest {
    /// Encode the query parameters as a query string.
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Encode/decode strategy for one protocol version.
///
/// `parse_response` never fails: any problem with the body is reported as
/// [`ValidationOutcome::Failure`].
pub trait ProtocolAdapter: Send + Sync {
    fn version(&self) -> ProtocolVersion;

    fn build_request(&self, service_url: &str, ticket: &str) -> ValidationRequest;

    fn parse_response(&self, body: &str) -> ValidationOutcome;
}
