//! CAS 1.0 `/validate`: two-line plain text responses.

use super::{
    Attributes, ProtocolAdapter, ProtocolVersion, RequestMethod, ValidationOutcome,
    ValidationRequest, AUTH_FAILED, BAD_RESPONSE,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct V1Adapter;

impl ProtocolAdapter for V1Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn build_request(&self, service_url: &str, ticket: &str) -> ValidationRequest {
        ValidationRequest {
            method: RequestMethod::Get,
            query: vec![
                ("service", service_url.to_string()),
                ("ticket", ticket.to_string()),
            ],
            body: None,
        }
    }

    fn parse_response(&self, body: &str) -> ValidationOutcome {
        let lines: Vec<&str> = body.split('\n').map(str::trim_end).collect();

        match lines.as_slice() {
            ["yes", identity, ..] if !identity.is_empty() => {
                ValidationOutcome::success(*identity, Attributes::new())
            }
            ["no", ..] => ValidationOutcome::failure(AUTH_FAILED),
            _ => ValidationOutcome::failure(BAD_RESPONSE),
        }
    }
}
