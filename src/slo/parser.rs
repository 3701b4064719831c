//! Parse CAS back-channel logout notifications.
//!
//! CAS posts a form field `logoutRequest` holding a SAML 2.0 `LogoutRequest`
//! whose `SessionIndex` is the service ticket that created the session.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Form field carrying the logout request.
pub const LOGOUT_REQUEST_FIELD: &str = "logoutRequest";

/// Maximum accepted payload size.
const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Parsed logout notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutNotification {
    /// ID of the LogoutRequest, if present.
    pub id: Option<String>,
    /// NameID of the user being logged out, if present.
    pub name_id: Option<String>,
    /// The service ticket identifying the session to tear down.
    pub session_index: String,
}

/// Extract the LogoutRequest XML from a notification body.
///
/// Accepts a form-encoded body with a `logoutRequest` field, or raw XML.
pub fn extract_logout_request(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.starts_with('<') {
        return Some(trimmed.to_string());
    }

    for pair in trimmed.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            if key == LOGOUT_REQUEST_FIELD {
                let value = value.replace('+', " ");
                return urlencoding::decode(&value).ok().map(|s| s.into_owned());
            }
        }
    }
    None
}

/// Parse a LogoutRequest document.
pub fn parse_logout_request(xml: &str) -> Result<LogoutNotification, String> {
    if xml.len() > MAX_PAYLOAD_SIZE {
        return Err("LogoutRequest too large".to_string());
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut id = None;
    let mut name_id = None;
    let mut session_index = None;
    let mut saw_root = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).to_string();

                if local == "LogoutRequest" {
                    saw_root = true;
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"ID" {
                            id = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }
                current_element = local;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| format!("XML parse error: {}", e))?
                    .trim()
                    .to_string();
                match current_element.as_str() {
                    "NameID" => name_id = Some(text),
                    "SessionIndex" => session_index = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {}", e)),
            _ => {}
        }
    }

    if !saw_root {
        return Err("Not a LogoutRequest".to_string());
    }

    let session_index = session_index
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "Missing SessionIndex".to_string())?;

    Ok(LogoutNotification {
        id,
        name_id,
        session_index,
    })
}
