//! SAML 1.1 `/samlValidate`.
//!
//! The ticket travels as an `AssertionArtifact` inside a SOAP envelope; the
//! response is a SOAP-wrapped SAML 1.1 `Response`.

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use super::xml::{parse_document, Element};
use super::{
    AttributeValue, Attributes, ProtocolAdapter, ProtocolVersion, RequestMethod,
    ValidationOutcome, ValidationRequest, AUTH_FAILED, BAD_RESPONSE,
};

pub const SOAP_CONTENT_TYPE: &str = "text/xml";

#[derive(Debug, Clone, Copy, Default)]
pub struct Saml11Adapter;

/// Build the SOAP request envelope carrying `ticket`.
pub fn build_soap_envelope(ticket: &str) -> String {
    let request_id = format!("_{}", uuid::Uuid::new_v4().simple());
    let issue_instant = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    format!(
        concat!(
            r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<SOAP-ENV:Header/><SOAP-ENV:Body>"#,
            r#"<samlp:Request xmlns:samlp="urn:oasis:names:tc:SAML:1.0:protocol" MajorVersion="1" MinorVersion="1" RequestID="{}" IssueInstant="{}">"#,
            r#"<samlp:AssertionArtifact>{}</samlp:AssertionArtifact>"#,
            r#"</samlp:Request></SOAP-ENV:Body></SOAP-ENV:Envelope>"#
        ),
        request_id,
        issue_instant,
        escape_text(ticket)
    )
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl ProtocolAdapter for Saml11Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::Saml11
    }

    fn build_request(&self, service_url: &str, ticket: &str) -> ValidationRequest {
        ValidationRequest {
            method: RequestMethod::Post,
            query: vec![("TARGET", service_url.to_string())],
            body: Some((build_soap_envelope(ticket), SOAP_CONTENT_TYPE)),
        }
    }

    fn parse_response(&self, body: &str) -> ValidationOutcome {
        let root = match parse_document(body, false) {
            Ok(root) => root,
            Err(e) => {
                debug!(error = %e, "Unparseable samlValidate response");
                return ValidationOutcome::failure(BAD_RESPONSE);
            }
        };

        match interpret(&root) {
            Some(outcome) => outcome,
            None => ValidationOutcome::failure(AUTH_FAILED),
        }
    }
}

/// `None` when the document does not have the expected shape.
fn interpret(envelope: &Element) -> Option<ValidationOutcome> {
    if envelope.name != "Envelope" {
        return None;
    }
    let response = envelope.child("Body")?.child("Response")?;

    let status = response
        .child("Status")?
        .child("StatusCode")?
        .attribute("Value")?;
    let code = status.rsplit(':').next().unwrap_or(status);

    if code != "Success" {
        return Some(ValidationOutcome::failure(format!(
            "CAS authentication failed ({}).",
            code
        )));
    }

    let assertion = response.child("Assertion")?;
    let identity = assertion
        .child("AuthenticationStatement")?
        .child("Subject")?
        .child("NameIdentifier")?
        .text();
    if identity.is_empty() {
        return None;
    }

    let mut attributes = Attributes::new();
    for statement in assertion.children_named("AttributeStatement") {
        for attribute in statement.children_named("Attribute") {
            let Some(name) = attribute.attribute("AttributeName") else {
                continue;
            };
            let values: Vec<String> = attribute
                .children_named("AttributeValue")
                .map(|v| v.text().to_string())
                .collect();
            if values.is_empty() {
                continue;
            }
            attributes.insert(name.to_string(), AttributeValue::from_values(values));
        }
    }

    Some(ValidationOutcome::success(identity, attributes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Header/>
  <SOAP-ENV:Body>
    <saml1p:Response xmlns:saml1p="urn:oasis:names:tc:SAML:1.0:protocol" IssueInstant="2024-01-01T00:00:00.000Z" MajorVersion="1" MinorVersion="1" ResponseID="_r1">
      <saml1p:Status>
        <saml1p:StatusCode Value="saml1p:Success"/>
      </saml1p:Status>
      <saml1:Assertion xmlns:saml1="urn:oasis:names:tc:SAML:1.0:assertion" AssertionID="_a1" MajorVersion="1" MinorVersion="1">
        <saml1:AuthenticationStatement AuthenticationMethod="urn:oasis:names:tc:SAML:1.0:am:password">
          <saml1:Subject>
            <saml1:NameIdentifier>jdoe</saml1:NameIdentifier>
          </saml1:Subject>
        </saml1:AuthenticationStatement>
        <saml1:AttributeStatement>
          <saml1:Subject>
            <saml1:NameIdentifier>jdoe</saml1:NameIdentifier>
          </saml1:Subject>
          <saml1:Attribute AttributeName="email" AttributeNamespace="http://www.ja-sig.org/products/cas/">
            <saml1:AttributeValue>jdoe@example.com</saml1:AttributeValue>
          </saml1:Attribute>
          <saml1:Attribute AttributeName="groups" AttributeNamespace="http://www.ja-sig.org/products/cas/">
            <saml1:AttributeValue>staff</saml1:AttributeValue>
            <saml1:AttributeValue>faculty</saml1:AttributeValue>
          </saml1:Attribute>
        </saml1:AttributeStatement>
      </saml1:Assertion>
    </saml1p:Response>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

    const DENIED: &str = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <saml1p:Response xmlns:saml1p="urn:oasis:names:tc:SAML:1.0:protocol">
      <saml1p:Status>
        <saml1p:StatusCode Value="saml1p:RequestDenied"/>
      </saml1p:Status>
    </saml1p:Response>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

    #[test]
    fn test_success_with_attributes() {
        let outcome = Saml11Adapter.parse_response(SUCCESS);

        let mut expected = Attributes::new();
        expected.insert(
            "email".to_string(),
            AttributeValue::Single("jdoe@example.com".to_string()),
        );
        expected.insert(
            "groups".to_string(),
            AttributeValue::Multiple(vec!["staff".to_string(), "faculty".to_string()]),
        );
        assert_eq!(outcome, ValidationOutcome::success("jdoe", expected));
    }

    #[test]
    fn test_success_without_attribute_statement() {
        let body = SUCCESS.replace("AttributeStatement", "Other");
        let outcome = Saml11Adapter.parse_response(&body);
        assert_eq!(outcome, ValidationOutcome::success("jdoe", Attributes::new()));
    }

    #[test]
    fn test_unnamed_attribute_is_skipped() {
        let body = SUCCESS.replace(r#"AttributeName="email" "#, "");
        let outcome = Saml11Adapter.parse_response(&body);

        let mut expected = Attributes::new();
        expected.insert(
            "groups".to_string(),
            AttributeValue::Multiple(vec!["staff".to_string(), "faculty".to_string()]),
        );
        assert_eq!(outcome, ValidationOutcome::success("jdoe", expected));
    }

    #[test]
    fn test_non_success_status() {
        assert_eq!(
            Saml11Adapter.parse_response(DENIED),
            ValidationOutcome::failure("CAS authentication failed (RequestDenied).")
        );
    }

    #[test]
    fn test_missing_pieces_fail() {
        let no_subject = SUCCESS.replace("AuthenticationStatement", "Unknown");
        assert_eq!(
            Saml11Adapter.parse_response(&no_subject),
            ValidationOutcome::failure(AUTH_FAILED)
        );
        assert_eq!(
            Saml11Adapter.parse_response("<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"x\"/>"),
            ValidationOutcome::failure(AUTH_FAILED)
        );
        assert!(!Saml11Adapter.parse_response("<<<").is_success());
    }

    #[test]
    fn test_envelope_carries_ticket() {
        let request = Saml11Adapter.build_request("https://app.example.com/home", "ST-42");
        assert_eq!(request.method, RequestMethod::Post);
        assert_eq!(
            request.query_string(),
            "TARGET=https%3A%2F%2Fapp.example.com%2Fhome"
        );

        let (body, content_type) = request.body.unwrap();
        assert_eq!(content_type, "text/xml");
        assert!(body.contains("<samlp:AssertionArtifact>ST-42</samlp:AssertionArtifact>"));
        assert!(body.contains("RequestID=\"_"));
        assert!(body.contains("IssueInstant=\""));

        let parsed = parse_document(&body, false).unwrap();
        let artifact = parsed
            .child("Body")
            .and_then(|b| b.child("Request"))
            .and_then(|r| r.child("AssertionArtifact"))
            .unwrap();
        assert_eq!(artifact.text(), "ST-42");
    }
}
