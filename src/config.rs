//! CAS client configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::protocol::{AttributeValue, ProtocolVersion};

/// CAS client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CasConfig {
    /// CAS server base URL (e.g., "https://cas.example.com/cas").
    #[serde(default)]
    pub cas_url: String,

    /// Externally visible URL of this service; the request path is appended.
    #[serde(default)]
    pub service_url: String,

    /// Protocol version used for ticket validation.
    #[serde(default = "default_version")]
    pub cas_version: ProtocolVersion,

    /// Ask CAS to re-authenticate the user even with an SSO session.
    #[serde(default)]
    pub renew: bool,

    /// Skip CAS entirely and log everyone in as `dev_mode_user`.
    #[serde(default)]
    pub is_dev_mode: bool,

    #[serde(default)]
    pub dev_mode_user: String,

    #[serde(default)]
    pub dev_mode_info: HashMap<String, AttributeValue>,

    /// Session slot holding the authenticated identity.
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Session slot holding released attributes (not stored when unset).
    #[serde(default)]
    pub session_info: Option<String>,

    /// Session slot holding the URL to return to after login.
    #[serde(default = "default_return_to_key")]
    pub return_to_key: String,

    /// Destroy the whole session on logout instead of clearing the slots.
    #[serde(default)]
    pub destroy_session: bool,

    /// Track ticket to session bindings and honour CAS logout notifications.
    #[serde(default)]
    pub single_logout: bool,

    /// Where CAS should send the user after logout (defaults to `service_url`).
    #[serde(default)]
    pub logout_redirect_url: Option<String>,

    /// Bound on the validation round trip. Transport defaults apply when unset.
    #[serde(default)]
    pub validation_timeout_secs: Option<u64>,

    /// Lifetime of a ticket to session binding.
    #[serde(default = "default_binding_ttl")]
    pub binding_ttl_secs: u64,
}

fn default_version() -> ProtocolVersion {
    ProtocolVersion::V3
}

fn default_session_name() -> String {
    "cas_user".to_string()
}

fn default_return_to_key() -> String {
    "cas_return_to".to_string()
}

/// Upper bound on `binding_ttl_secs` (one year).
pub const MAX_BINDING_TTL_SECS: u64 = 365 * 24 * 60 * 60;

fn default_binding_ttl() -> u64 {
    24 * 60 * 60 // 24 hours
}

impl Default for CasConfig {
    fn default() -> Self {
        Self {
            cas_url: String::new(),
            service_url: String::new(),
            cas_version: default_version(),
            renew: false,
            is_dev_mode: false,
            dev_mode_user: String::new(),
            dev_mode_info: HashMap::new(),
            session_name: default_session_name(),
            session_info: None,
            return_to_key: default_return_to_key(),
            destroy_session: false,
            single_logout: false,
            logout_redirect_url: None,
            validation_timeout_secs: None,
            binding_ttl_secs: default_binding_ttl(),
        }
    }
}

impl CasConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cas_url.is_empty() {
            return Err("CAS cas_url is required".to_string());
        }
        let cas_url =
            Url::parse(&self.cas_url).map_err(|e| format!("CAS cas_url is invalid: {}", e))?;
        if cas_url.scheme() != "https" && cas_url.scheme() != "http" {
            return Err("CAS cas_url must be a valid HTTP(S) URL".to_string());
        }
        if cas_url.host_str().is_none() {
            return Err("CAS cas_url must include a host".to_string());
        }

        if self.service_url.is_empty() {
            return Err("CAS service_url is required".to_string());
        }
        Url::parse(&self.service_url).map_err(|e| format!("CAS service_url is invalid: {}", e))?;

        if self.session_name.is_empty() {
            return Err("CAS session_name must not be empty".to_string());
        }

        if self.binding_ttl_secs == 0 || self.binding_ttl_secs > MAX_BINDING_TTL_SECS {
            return Err(format!(
                "CAS binding_ttl_secs must be between 1 and {}",
                MAX_BINDING_TTL_SECS
            ));
        }

        if self.is_dev_mode && self.dev_mode_user.is_empty() {
            return Err("CAS dev_mode_user is required in dev mode".to_string());
        }

        Ok(())
    }

    /// CAS base URL without a trailing slash.
    pub fn cas_base(&self) -> &str {
        self.cas_url.trim_end_matches('/')
    }

    /// Service URL without a trailing slash, ready for a path to be appended.
    pub fn service_base(&self) -> &str {
        self.service_url.trim_end_matches('/')
    }
}

/// JSON configuration for dynamic reconfiguration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct CasConfigJson {
    pub cas_url: Option<String>,
    pub service_url: Option<String>,
    pub cas_version: Option<String>,
    pub renew: Option<bool>,
    pub is_dev_mode: Option<bool>,
    pub dev_mode_user: Option<String>,
    #[serde(default)]
    pub dev_mode_info: HashMap<String, AttributeValue>,
    pub session_name: Option<String>,
    pub session_info: Option<String>,
    pub destroy_session: Option<bool>,
    pub single_logout: Option<bool>,
    pub logout_redirect_url: Option<String>,
    pub validation_timeout_secs: Option<u64>,
    pub binding_ttl_secs: Option<u64>,
}

impl CasConfigJson {
    /// Merge JSON config into existing config.
    pub fn apply_to(&self, config: &mut CasConfig) -> Result<(), String> {
        if let Some(ref url) = self.cas_url {
            config.cas_url = url.clone();
        }
        if let Some(ref url) = self.service_url {
            config.service_url = url.clone();
        }
        if let Some(ref version) = self.cas_version {
            config.cas_version = version.parse()?;
        }
        if let Some(renew) = self.renew {
            config.renew = renew;
        }
        if let Some(dev) = self.is_dev_mode {
            config.is_dev_mode = dev;
        }
        if let Some(ref user) = self.dev_mode_user {
            config.dev_mode_user = user.clone();
        }
        if !self.dev_mode_info.is_empty() {
            config.dev_mode_info = self.dev_mode_info.clone();
        }
        if let Some(ref name) = self.session_name {
            config.session_name = name.clone();
        }
        if let Some(ref info) = self.session_info {
            config.session_info = Some(info.clone());
        }
        if let Some(destroy) = self.destroy_session {
            config.destroy_session = destroy;
        }
        if let Some(slo) = self.single_logout {
            config.single_logout = slo;
        }
        if let Some(ref url) = self.logout_redirect_url {
            config.logout_redirect_url = Some(url.clone());
        }
        if let Some(secs) = self.validation_timeout_secs {
            config.validation_timeout_secs = Some(secs);
        }
        if let Some(secs) = self.binding_ttl_secs {
            config.binding_ttl_secs = secs;
        }
        Ok(())
    }
}
