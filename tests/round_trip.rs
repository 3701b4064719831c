//! End-to-end flows against a mock CAS server.

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use zentinel_agent_cas::session::SessionStore;
use zentinel_agent_cas::{
    AuthMode, AuthResponse, CasAuthenticator, CasConfig, CasRequest, LogoutAck,
    MemorySessionStore, ProtocolVersion, Session, SingleLogoutReconciler,
};

const SERVICE_URL: &str = "https://app.example.com";

const V2_SUCCESS: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>jdoe</cas:user>
    <cas:attributes>
      <cas:mail>jdoe@example.com</cas:mail>
      <cas:role>staff</cas:role>
      <cas:role>admin</cas:role>
    </cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;

const V2_FAILURE: &str = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationFailure code="INVALID_TICKET">Ticket not recognized</cas:authenticationFailure>
</cas:serviceResponse>"#;

/// An address nothing listens on.
fn closed_addr() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn config(server: &MockServer) -> CasConfig {
    CasConfig {
        cas_url: format!("{}/cas", server.uri()),
        service_url: SERVICE_URL.to_string(),
        cas_version: ProtocolVersion::V2,
        session_info: Some("cas_attrs".to_string()),
        single_logout: true,
        validation_timeout_secs: Some(5),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_login_ticket_and_single_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .and(query_param("service", "https://app.example.com/reports"))
        .and(query_param("ticket", "ST-5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(V2_SUCCESS))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let cfg = config(&server);
    let engine = CasAuthenticator::new(cfg.clone(), Some(store.clone())).unwrap();
    let slo = SingleLogoutReconciler::new(&cfg, Some(store.clone())).unwrap();

    let mut session = Session::with_key("sess-9");

    // First visit: bounced to CAS login
    let response = engine
        .handle(&CasRequest::from_uri("/reports?year=2024"), &mut session, AuthMode::Bounce)
        .await;
    assert_eq!(
        response,
        AuthResponse::redirect(format!(
            "{}/cas/login?service=https%3A%2F%2Fapp.example.com%2Freports",
            server.uri()
        ))
    );
    assert_eq!(session.get_str("cas_user"), None);

    // Return from CAS with a ticket
    let response = engine
        .handle(&CasRequest::from_uri("/reports?ticket=ST-5"), &mut session, AuthMode::Bounce)
        .await;
    assert_eq!(response, AuthResponse::redirect("/reports?year=2024"));
    assert_eq!(session.get_str("cas_user"), Some("jdoe"));
    assert_eq!(
        session.get("cas_attrs"),
        Some(&serde_json::json!({"mail": "jdoe@example.com", "role": ["staff", "admin"]}))
    );

    let binding = store.get_binding("ST-5").await.unwrap().unwrap();
    assert_eq!(binding.session_key, "sess-9");

    // Subsequent requests proceed without another round trip
    store.save_session(&session, 3600).await.unwrap();
    let response = engine
        .handle(&CasRequest::from_uri("/reports"), &mut session, AuthMode::Block)
        .await;
    assert_eq!(response, AuthResponse::Proceed);

    // CAS pushes a logout for the ticket
    let xml = r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="LR-9" Version="2.0"><saml:NameID xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion">@NOT_USED@</saml:NameID><samlp:SessionIndex>ST-5</samlp:SessionIndex></samlp:LogoutRequest>"#;
    let body = format!("logoutRequest={}", urlencoding::encode(xml));
    let ack = slo.handle_notification(&body).await;

    assert_eq!(ack, LogoutAck::Complete);
    assert_eq!(ack.body(), "ok");
    assert!(store.get_session("sess-9").await.unwrap().is_none());
    assert!(store.get_binding("ST-5").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_ticket_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(V2_FAILURE))
        .mount(&server)
        .await;

    let store = Arc::new(MemorySessionStore::new());
    let engine = CasAuthenticator::new(config(&server), Some(store.clone())).unwrap();
    let mut session = Session::with_key("sess-1");

    let response = engine
        .handle(&CasRequest::from_uri("/app?ticket=ST-bad"), &mut session, AuthMode::Bounce)
        .await;

    assert_eq!(response.status(), Some(401));
    assert_eq!(session.get_str("cas_user"), None);
    assert!(!store.contains("ST-bad"));
}

#[tokio::test]
async fn test_server_error_page_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cas/serviceValidate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html><body>oops"))
        .mount(&server)
        .await;

    let engine = CasAuthenticator::new(config(&server), Some(Arc::new(MemorySessionStore::new()))).unwrap();
    let mut session = Session::with_key("sess-1");

    let response = engine
        .handle(&CasRequest::from_uri("/app?ticket=ST-1"), &mut session, AuthMode::Bounce)
        .await;
    assert_eq!(response.status(), Some(401));
}

#[tokio::test]
async fn test_unreachable_server_is_unauthorized() {
    let server = MockServer::start().await;
    let mut cfg = config(&server);
    cfg.cas_url = format!("http://{}/cas", closed_addr());

    let engine = CasAuthenticator::new(cfg, Some(Arc::new(MemorySessionStore::new()))).unwrap();
    let mut session = Session::with_key("sess-1");

    let response = engine
        .handle(&CasRequest::from_uri("/app?ticket=ST-1"), &mut session, AuthMode::Bounce)
        .await;
    assert_eq!(response, AuthResponse::unauthorized());
    assert!(session.is_empty());
}
