//! Single logout reconciliation.
//!
//! Maps the ticket named in a logout notification back to the session it
//! created and destroys both. Every step is best effort: a failed step
//! downgrades the acknowledgement to partial success and never undoes or
//! blocks the steps around it. The notifier always receives `ok`.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::parser::{extract_logout_request, parse_logout_request};
use crate::config::CasConfig;
use crate::error::{CasError, CasResult};
use crate::session::SessionStore;

/// Acknowledgement body sent to the CAS server.
pub const ACK_BODY: &str = "ok";

/// Outcome of handling one logout notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutAck {
    /// Every step succeeded, or single logout is disabled.
    Complete,
    /// At least one step failed.
    Partial,
}

impl LogoutAck {
    /// HTTP status reported to the notifier.
    pub fn status(&self) -> u16 {
        match self {
            LogoutAck::Complete => 200,
            LogoutAck::Partial => 202,
        }
    }

    pub fn body(&self) -> &'static str {
        ACK_BODY
    }

    fn downgrade(&mut self) {
        *self = LogoutAck::Partial;
    }
}

/// Handles back-channel logout notifications.
pub struct SingleLogoutReconciler {
    enabled: bool,
    store: Option<Arc<dyn SessionStore>>,
}

impl SingleLogoutReconciler {
    pub fn new(config: &CasConfig, store: Option<Arc<dyn SessionStore>>) -> CasResult<Self> {
        if config.single_logout && store.is_none() {
            return Err(CasError::Configuration(
                "single_logout requires a session store".to_string(),
            ));
        }
        Ok(Self {
            enabled: config.single_logout,
            store,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Handle a raw notification body (form-encoded or XML).
    pub async fn handle_notification(&self, body: &str) -> LogoutAck {
        let Some(store) = self.active_store() else {
            return LogoutAck::Complete;
        };

        let Some(xml) = extract_logout_request(body) else {
            warn!("Logout notification without a LogoutRequest");
            return LogoutAck::Partial;
        };

        match parse_logout_request(&xml) {
            Ok(notification) => {
                debug!(
                    id = ?notification.id,
                    session_index = %notification.session_index,
                    "Logout notification received"
                );
                reconcile(store.as_ref(), &notification.session_index).await
            }
            Err(e) => {
                warn!(error = %e, "Unparseable logout notification");
                LogoutAck::Partial
            }
        }
    }

    /// Tear down whatever the given ticket is bound to.
    pub async fn reconcile(&self, ticket: &str) -> LogoutAck {
        match self.active_store() {
            Some(store) => reconcile(store.as_ref(), ticket).await,
            None => LogoutAck::Complete,
        }
    }

    fn active_store(&self) -> Option<&Arc<dyn SessionStore>> {
        if self.enabled {
            self.store.as_ref()
        } else {
            None
        }
    }
}

async fn reconcile(store: &dyn SessionStore, ticket: &str) -> LogoutAck {
    let mut ack = LogoutAck::Complete;

    let binding = match store.get_binding(ticket).await {
        Ok(binding) => binding,
        Err(e) => {
            warn!(error = %e, ticket = %ticket, "Failed to read ticket binding");
            return LogoutAck::Partial;
        }
    };

    match binding {
        Some(binding) => {
            if let Err(e) = store.destroy(&binding.session_key).await {
                warn!(error = %e, session = %binding.session_key, "Failed to destroy session");
                ack.downgrade();
            }
            if let Err(e) = store.destroy(ticket).await {
                warn!(error = %e, ticket = %ticket, "Failed to destroy ticket binding");
                ack.downgrade();
            }
            info!(
                ticket = %ticket,
                session = %binding.session_key,
                complete = ack == LogoutAck::Complete,
                "Single logout processed"
            );
        }
        None => {
            debug!(ticket = %ticket, "No binding for ticket, destroying by ticket key");
            if let Err(e) = store.destroy(ticket).await {
                warn!(error = %e, ticket = %ticket, "Failed to destroy entry keyed by ticket");
                ack.downgrade();
            }
        }
    }

    ack
}
