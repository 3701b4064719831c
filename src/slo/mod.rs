//! CAS single logout.
//!
//! Parses back-channel logout notifications and tears down the session bound
//! to the named service ticket.

pub mod parser;
pub mod reconciler;

pub use parser::{extract_logout_request, parse_logout_request, LogoutNotification};
pub use reconciler::{LogoutAck, SingleLogoutReconciler, ACK_BODY};
