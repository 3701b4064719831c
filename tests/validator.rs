//! Ticket validation round trips for each protocol version.

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zentinel_agent_cas::{
    AttributeValue, Attributes, CasConfig, CasError, ProtocolVersion, TicketValidator,
    ValidationOutcome,
};

fn validator(server: &MockServer, version: ProtocolVersion) -> TicketValidator {
    let config = CasConfig {
        cas_url: format!("{}/cas", server.uri()),
        service_url: "https://app.example.com".to_string(),
        cas_version: version,
        ..Default::default()
    };
    TicketValidator::new(&config).unwrap()
}

#[tokio::test]
async fn test_v1_validate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/validate"))
        .and(query_param("ticket", "ST-1"))
        .and(query_param("service", "https://app.example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("yes\njdoe\n"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = validator(&server, ProtocolVersion::V1)
        .validate("ST-1", "https://app.example.com/")
        .await
        .unwrap();
    assert_eq!(outcome, ValidationOutcome::success("jdoe", Attributes::new()));
}

#[tokio::test]
async fn test_v3_failure_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/p3/serviceValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas"><cas:authenticationFailure code="INVALID_SERVICE">bad service</cas:authenticationFailure></cas:serviceResponse>"#,
        ))
        .mount(&server)
        .await;

    let outcome = validator(&server, ProtocolVersion::V3)
        .validate("ST-2", "https://app.example.com/x")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ValidationOutcome::failure("CAS authentication failed (INVALID_SERVICE).")
    );
}

#[tokio::test]
async fn test_saml11_post_envelope() {
    let server = MockServer::start().await;
    let response = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"><SOAP-ENV:Body>
<saml1p:Response xmlns:saml1p="urn:oasis:names:tc:SAML:1.0:protocol">
<saml1p:Status><saml1p:StatusCode Value="saml1p:Success"/></saml1p:Status>
<saml1:Assertion xmlns:saml1="urn:oasis:names:tc:SAML:1.0:assertion">
<saml1:AuthenticationStatement><saml1:Subject><saml1:NameIdentifier>jdoe</saml1:NameIdentifier></saml1:Subject></saml1:AuthenticationStatement>
<saml1:AttributeStatement><saml1:Attribute AttributeName="uid"><saml1:AttributeValue>1001</saml1:AttributeValue></saml1:Attribute></saml1:AttributeStatement>
</saml1:Assertion></saml1p:Response></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;

    Mock::given(method("POST"))
        .and(path("/cas/samlValidate"))
        .and(query_param("TARGET", "https://app.example.com/home"))
        .and(header("content-type", "text/xml"))
        .and(body_string_contains(
            "<samlp:AssertionArtifact>ST-3</samlp:AssertionArtifact>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(response))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = validator(&server, ProtocolVersion::Saml11)
        .validate("ST-3", "https://app.example.com/home")
        .await
        .unwrap();

    let mut expected = Attributes::new();
    expected.insert("uid".to_string(), AttributeValue::Single("1001".to_string()));
    assert_eq!(outcome, ValidationOutcome::success("jdoe", expected));
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = CasConfig {
        cas_url: format!("http://{}/cas", addr),
        service_url: "https://app.example.com".to_string(),
        cas_version: ProtocolVersion::V2,
        validation_timeout_secs: Some(5),
        ..Default::default()
    };
    let validator = TicketValidator::new(&config).unwrap();

    let result = validator.validate("ST-4", "https://app.example.com/").await;
    assert!(matches!(result, Err(CasError::Network(_))));
}
