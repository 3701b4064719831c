//! CAS 2.0 `/serviceValidate` and CAS 3.0 `/p3/serviceValidate`.
//!
//! Both versions share the `serviceResponse` document. Tag names are
//! prefix-stripped and lowercased before lookup, so attribute names come out
//! lowercased as well.

use tracing::debug;

use super::xml::{parse_document, Element};
use super::{
    AttributeValue, Attributes, ProtocolAdapter, ProtocolVersion, RequestMethod,
    ValidationOutcome, ValidationRequest, AUTH_FAILED, BAD_RESPONSE,
};

#[derive(Debug, Clone, Copy)]
pub struct ServiceValidateAdapter {
    version: ProtocolVersion,
}

impl ServiceValidateAdapter {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }
}

impl ProtocolAdapter for ServiceValidateAdapter {
    fn version(&self) -> ProtocolVersion {
        self.version
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
        let root = match parse_document(body, true) {
            Ok(root) => root,
            Err(e) => {
                debug!(error = %e, "Unparseable serviceValidate response");
                return ValidationOutcome::failure(BAD_RESPONSE);
            }
        };

        if root.name != "serviceresponse" {
            return ValidationOutcome::failure(AUTH_FAILED);
        }

        if let Some(failure) = root.child("authenticationfailure") {
            return match failure.attribute("code") {
                Some(code) => {
                    ValidationOutcome::failure(format!("CAS authentication failed ({}).", code))
                }
                None => ValidationOutcome::failure(AUTH_FAILED),
            };
        }

        let Some(success) = root.child("authenticationsuccess") else {
            return ValidationOutcome::failure(AUTH_FAILED);
        };

        match success.child("user").map(Element::text) {
            Some(user) if !user.is_empty() => {
                let attributes = success
                    .child("attributes")
                    .map(collect_attributes)
                    .unwrap_or_default();
                ValidationOutcome::success(user, attributes)
            }
            _ => ValidationOutcome::failure(AUTH_FAILED),
        }
    }
}

/// Repeated elements become multi-valued attributes.
fn collect_attributes(block: &Element) -> Attributes {
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();

    for child in &block.children {
        match grouped.iter_mut().find(|(name, _)| *name == child.name) {
            Some((_, values)) => values.push(child.text().to_string()),
            None => grouped.push((child.name.clone(), vec![child.text().to_string()])),
        }
    }

    grouped
        .into_iter()
        .map(|(name, values)| (name, AttributeValue::from_values(values)))
        .collect()
}
