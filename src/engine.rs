//! Per-request authentication decisions.
//!
//! A request is either already authenticated, short-circuited in dev mode,
//! blocked, sent to CAS to log in, or carries a ticket to validate. The
//! engine keeps no state between requests beyond the session it is handed.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CasConfig;
use crate::error::{CasError, CasResult};
use crate::protocol::ValidationOutcome;
use crate::request::{AuthMode, AuthResponse, CasRequest};
use crate::session::{Session, SessionStore, StoreEntry, TicketSessionBinding};
use crate::validator::TicketValidator;

/// Session slot remembering the ticket that created the session, kept only
/// when single logout is enabled.
pub const TICKET_SLOT: &str = "cas_ticket";

/// CAS authentication engine.
pub struct CasAuthenticator {
    config: CasConfig,
    validator: TicketValidator,
    /// Required when single logout is enabled.
    store: Option<Arc<dyn SessionStore>>,
}

impl CasAuthenticator {
    /// Create an authenticator. Fails fast on invalid configuration.
    pub fn new(config: CasConfig, store: Option<Arc<dyn SessionStore>>) -> CasResult<Self> {
        config.validate().map_err(CasError::Configuration)?;

        if config.single_logout && store.is_none() {
            return Err(CasError::Configuration(
                "single_logout requires a session store".to_string(),
            ));
        }

        let validator = TicketValidator::new(&config)?;

        info!(
            cas_url = %config.cas_url,
            version = %config.cas_version,
            dev_mode = config.is_dev_mode,
            single_logout = config.single_logout,
            "CAS authenticator configured"
        );

        Ok(Self {
            config,
            validator,
            store,
        })
    }

    pub fn config(&self) -> &CasConfig {
        &self.config
    }

    /// Decide what to do with one request.
    pub async fn handle(
        &self,
        request: &CasRequest,
        session: &mut Session,
        mode: AuthMode,
    ) -> AuthResponse {
        let config = &self.config;

        if is_present(session.get(&config.session_name)) {
            if mode == AuthMode::BounceRedirect {
                let location = request
                    .query("redirectTo")
                    .unwrap_or(&config.service_url)
                    .to_string();
                debug!(location = %location, "Authenticated, following redirectTo");
                return AuthResponse::redirect(location);
            }
            return AuthResponse::Proceed;
        }

        if config.is_dev_mode {
            debug!(user = %config.dev_mode_user, "Dev mode, skipping CAS");
            session.set(
                config.session_name.clone(),
                Value::String(config.dev_mode_user.clone()),
            );
            if let Some(ref info_slot) = config.session_info {
                session.set(
                    info_slot.clone(),
                    serde_json::to_value(&config.dev_mode_info).unwrap_or_default(),
                );
            }
            return AuthResponse::Proceed;
        }

        if mode == AuthMode::Block {
            debug!(path = %request.path(), "Unauthenticated request blocked");
            return AuthResponse::unauthorized();
        }

        match request.query("ticket") {
            Some(ticket) if !ticket.is_empty() => self.handle_ticket(ticket, request, session).await,
            _ => self.login_redirect(request, session),
        }
    }

    async fn handle_ticket(
        &self,
        ticket: &str,
        request: &CasRequest,
        session: &mut Session,
    ) -> AuthResponse {
        let config = &self.config;
        let service_url = self.service_url_for(request.path());

        let outcome = match self.validator.validate(ticket, &service_url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, ticket = %ticket, "Ticket validation failed");
                return AuthResponse::unauthorized();
            }
        };

        let (identity, attributes) = match outcome {
            ValidationOutcome::Success {
                identity,
                attributes,
            } => (identity, attributes),
            ValidationOutcome::Failure { reason } => {
                info!(reason = %reason, ticket = %ticket, "CAS rejected ticket");
                return AuthResponse::unauthorized();
            }
        };

        session.set(config.session_name.clone(), Value::String(identity.clone()));
        if let Some(ref info_slot) = config.session_info {
            session.set(
                info_slot.clone(),
                serde_json::to_value(&attributes).unwrap_or_default(),
            );
        }

        if config.single_logout {
            session.set(TICKET_SLOT, Value::String(ticket.to_string()));
            self.register_binding(ticket, &session.key).await;
        }

        let location = session
            .remove(&config.return_to_key)
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| request.path().to_string());

        info!(user = %identity, location = %location, "CAS login complete");
        AuthResponse::redirect(location)
    }

    /// Remember which session a ticket created. Failures are logged only.
    async fn register_binding(&self, ticket: &str, session_key: &str) {
        let Some(ref store) = self.store else {
            return;
        };

        let binding = TicketSessionBinding {
            ticket: ticket.to_string(),
            session_key: session_key.to_string(),
        };
        match store
            .set(ticket, StoreEntry::Binding(binding), self.config.binding_ttl_secs)
            .await
        {
            Ok(()) => debug!(ticket = %ticket, session = %session_key, "Ticket binding stored"),
            Err(e) => warn!(error = %e, ticket = %ticket, "Failed to store ticket binding"),
        }
    }

    fn login_redirect(&self, request: &CasRequest, session: &mut Session) -> AuthResponse {
        let return_to = request
            .query("returnTo")
            .map(String::from)
            .unwrap_or_else(|| request.path_and_query());
        session.set(self.config.return_to_key.clone(), Value::String(return_to));

        let location = self.login_url(request.path());
        info!(path = %request.path(), "No CAS session, redirecting to login");
        AuthResponse::redirect(location)
    }

    /// CAS login URL for a request path.
    pub fn login_url(&self, path: &str) -> String {
        let mut url = format!(
            "{}/login?service={}",
            self.config.cas_base(),
            urlencoding::encode(&self.service_url_for(path))
        );
        if self.config.renew {
            url.push_str("&renew=true");
        }
        url
    }

    /// Log the user out locally and send them to the CAS logout page.
    pub async fn logout(&self, session: &mut Session) -> AuthResponse {
        let config = &self.config;
        let ticket = session.get_str(TICKET_SLOT).map(String::from);

        if let Some(ref store) = self.store {
            if let Some(ref ticket) = ticket {
                if let Err(e) = store.destroy(ticket).await {
                    warn!(error = %e, ticket = %ticket, "Failed to remove ticket binding");
                }
            }
            if config.destroy_session {
                if let Err(e) = store.destroy(&session.key).await {
                    warn!(error = %e, session = %session.key, "Failed to destroy session");
                }
            }
        }

        if config.destroy_session {
            session.slots.clear();
        } else {
            session.remove(&config.session_name);
            if let Some(ref info_slot) = config.session_info {
                session.remove(info_slot);
            }
            session.remove(TICKET_SLOT);
        }

        let target = config
            .logout_redirect_url
            .as_deref()
            .unwrap_or(&config.service_url);
        let location = format!(
            "{}/logout?service={}",
            config.cas_base(),
            urlencoding::encode(target)
        );

        info!(session = %session.key, "CAS logout");
        AuthResponse::redirect(location)
    }

    fn service_url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.service_base(), path)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}
