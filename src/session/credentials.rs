//! Session credential set
//!
//! Holds the three opaque browser cookies that authenticate a web session
//! and renders them as a `Cookie` header. Secret values never appear in
//! `Debug` output.

use crate::{Result, config::GeminiSettings, config::settings::redact};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Long-lived session cookie name
pub const PSID_COOKIE: &str = "__Secure-1PSID";
/// Rotating session cookie name
pub const PSIDTS_COOKIE: &str = "__Secure-1PSIDTS";
/// Context cookie name
pub const PSIDCC_COOKIE: &str = "__Secure-1PSIDCC";

/// The three session secrets plus the time the rotating one last changed
#[derive(Clone)]
pub struct CredentialSet {
    long_lived: String,
    rotating: String,
    context: String,
    updated_at: DateTime<Utc>,
}

impl CredentialSet {
    /// Build a credential set from raw values, normalizing each of them
    pub fn new(
        long_lived: impl AsRef<str>,
        rotating: impl AsRef<str>,
        context: impl AsRef<str>,
    ) -> Result<Self> {
        let long_lived = clean_cookie(long_lived.as_ref());
        if long_lived.is_empty() {
            return Err(crate::Error::config(format!("{PSID_COOKIE} is required")));
        }
        Ok(Self {
            long_lived,
            rotating: clean_cookie(rotating.as_ref()),
            context: clean_cookie(context.as_ref()),
            updated_at: Utc::now(),
        })
    }

    /// Build a credential set from settings
    ///
    /// Explicit values win; a raw browser cookie header fills in whatever
    /// is missing.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self> {
        let header = settings
            .cookies
            .as_deref()
            .map(parse_cookie_header)
            .unwrap_or_default();

        let pick = |explicit: &str, name: &str| -> String {
            let explicit = clean_cookie(explicit);
            if explicit.is_empty() {
                header.get(name).cloned().unwrap_or_default()
            } else {
                explicit
            }
        };

        Self::new(
            pick(&settings.secure_1psid, PSID_COOKIE),
            pick(&settings.secure_1psidts, PSIDTS_COOKIE),
            pick(&settings.secure_1psidcc, PSIDCC_COOKIE),
        )
    }

    pub fn long_lived(&self) -> &str {
        &self.long_lived
    }

    pub fn rotating(&self) -> &str {
        &self.rotating
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when the rotating secret has never been obtained
    pub fn needs_rotation(&self) -> bool {
        self.rotating.is_empty()
    }

    /// Replace the rotating secret and stamp the update time
    pub fn set_rotating(&mut self, value: &str) {
        self.rotating = clean_cookie(value);
        self.updated_at = Utc::now();
    }

    /// Replace the context secret
    pub fn set_context(&mut self, value: &str) {
        self.context = clean_cookie(value);
    }

    /// Redacted view safe to log or print
    pub fn status(&self) -> CredentialStatus {
        CredentialStatus {
            long_lived: redact(&self.long_lived),
            rotating: redact(&self.rotating),
            context: redact(&self.context),
            updated_at: self.updated_at,
        }
    }

    /// Secrets as name/value pairs, empty values skipped
    pub fn secret_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            (PSID_COOKIE, self.long_lived.as_str()),
            (PSIDTS_COOKIE, self.rotating.as_str()),
            (PSIDCC_COOKIE, self.context.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }

    /// Render a `Cookie` header value with only the secrets
    pub fn cookie_header(&self) -> String {
        self.cookie_header_with(&BTreeMap::new())
    }

    /// Render a `Cookie` header value with ambient cookies first
    ///
    /// The secrets always override an ambient cookie of the same name.
    pub fn cookie_header_with(&self, ambient: &BTreeMap<String, String>) -> String {
        let secrets = self.secret_pairs();
        let mut parts: Vec<String> = ambient
            .iter()
            .filter(|(name, _)| !secrets.iter().any(|(secret, _)| *secret == name.as_str()))
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        parts.extend(
            secrets
                .into_iter()
                .map(|(name, value)| format!("{name}={value}")),
        );
        parts.join("; ")
    }
}

/// Redacted snapshot of a credential set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub long_lived: String,
    pub rotating: String,
    pub context: String,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("long_lived", &redact(&self.long_lived))
            .field("rotating", &redact(&self.rotating))
            .field("context", &redact(&self.context))
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Strip the noise browsers and shells leave around a pasted cookie value
///
/// Whitespace, then surrounding double quotes, then surrounding single
/// quotes, then a trailing semicolon.
pub fn clean_cookie(raw: &str) -> String {
    let value = raw.trim();
    let value = value.trim_matches('"');
    let value = value.trim_matches('\'');
    let value = value.strip_suffix(';').unwrap_or(value);
    value.trim().to_string()
}

/// Parse a raw `Cookie` header (`a=1; b=2`) into a name/value map
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), clean_cookie(value)))
        })
        .collect()
}
