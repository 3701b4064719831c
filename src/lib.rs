//! Zentinel CAS Agent
//!
//! Client-side core for the CAS single-sign-on protocol family (CAS 1.0,
//! 2.0, 3.0 and SAML 1.1): ticket validation, the per-request
//! authentication decision and single logout reconciliation.

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod request;
pub mod session;
pub mod slo;
pub mod validator;

pub use config::{CasConfig, CasConfigJson};
pub use engine::CasAuthenticator;
pub use error::{CasError, CasResult};
pub use protocol::{AttributeValue, Attributes, ProtocolVersion, ValidationOutcome};
pub use request::{AuthMode, AuthResponse, CasRequest};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use slo::{LogoutAck, SingleLogoutReconciler};
pub use validator::TicketValidator;
