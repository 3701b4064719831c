//! The request surface the CAS core consumes and the responses it produces.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How unauthenticated requests are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Send unauthenticated users to the CAS login page.
    Bounce,
    /// Like `Bounce`, but authenticated users are sent on to `redirectTo`.
    BounceRedirect,
    /// Reject unauthenticated users with 401.
    Block,
}

/// Path and query parameters of an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CasRequest {
    path: String,
    query_string: Option<String>,
    query: HashMap<String, String>,
}

impl CasRequest {
    /// Parse from a request target such as `/app/page?ticket=ST-1`.
    pub fn from_uri(uri: &str) -> Self {
        let (path, query_string) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };

        let mut query = HashMap::new();
        for pair in query_string.unwrap_or_default().split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_component(key);
            // First occurrence wins
            query.entry(key).or_insert_with(|| decode_component(value));
        }

        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query_string: query_string.filter(|q| !q.is_empty()).map(String::from),
            query,
        }
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request path including the query string, if any.
    pub fn path_and_query(&self) -> String {
        match self.query_string {
            Some(ref q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Decoded value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

fn decode_component(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw)
}

/// Terminal outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResponse {
    /// Let the request continue to the application.
    Proceed,
    /// Send the client elsewhere.
    Redirect { location: String },
    /// Answer directly with a status and body.
    Block { status: u16, body: String },
}

impl AuthResponse {
    pub fn redirect(location: impl Into<String>) -> Self {
        AuthResponse::Redirect {
            location: location.into(),
        }
    }

    pub fn unauthorized() -> Self {
        AuthResponse::Block {
            status: 401,
            body: "Unauthorized".to_string(),
        }
    }

    /// HTTP status this outcome maps to (`None` when proceeding).
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthResponse::Proceed => None,
            AuthResponse::Redirect { .. } => Some(302),
            AuthResponse::Block { status, .. } => Some(*status),
        }
    }
}
