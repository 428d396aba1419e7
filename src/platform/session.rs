//! Platform session handles.
//!
//! The login flow itself lives outside this crate: a browser-driven capture
//! step signs in with the operator's credentials and saves the request
//! headers (authorization plus the platform's x-* headers) to a JSON file.
//! This module only loads that capture, or builds a session from a plain
//! bearer token.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScreenError};

/// Environment variable carrying a raw bearer token, as an alternative to a
/// captured headers file.
pub const ENV_PLATFORM_TOKEN: &str = "PLATFORM_TOKEN";

const HEADERS_FILE: &str = "headers.json";

/// An already-established platform session: the headers to attach to every
/// API request. Passed explicitly into the client constructor; there is no
/// ambient global session.
#[derive(Debug, Clone)]
pub struct Session {
    headers: BTreeMap<String, String>,
}

impl Session {
    /// Session from a bearer token alone.
    pub fn bearer(token: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {}", token.into()));
        Self { headers }
    }

    /// Load a captured headers file: a flat JSON object of header name to
    /// value. Only authorization and x-* headers are kept, mirroring what
    /// the capture step records.
    pub fn from_headers_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)?;

        let headers: BTreeMap<String, String> = raw
            .into_iter()
            .filter(|(name, _)| {
                let lower = name.to_lowercase();
                lower == "authorization" || lower.starts_with("x-")
            })
            .collect();

        let session = Self { headers };
        if !session.has_authorization() {
            return Err(ScreenError::Auth(format!(
                "{} has no authorization header; re-run the login capture",
                path.as_ref().display()
            )));
        }
        Ok(session)
    }

    /// Resolve a session: explicit headers path, then the default capture
    /// location under the user config dir, then a bearer token from the
    /// environment.
    pub fn load(headers_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = headers_path {
            return Self::from_headers_file(path);
        }

        if let Some(default_path) = Self::default_headers_path() {
            if default_path.exists() {
                return Self::from_headers_file(&default_path);
            }
        }

        if let Ok(token) = std::env::var(ENV_PLATFORM_TOKEN) {
            if !token.trim().is_empty() {
                return Ok(Self::bearer(token));
            }
        }

        Err(ScreenError::Auth(
            "no platform session found; run the login capture with your \
             PLATFORM_EMAIL/PLATFORM_PASSWORD, or set PLATFORM_TOKEN"
                .to_string(),
        ))
    }

    /// Default location of the captured headers file.
    pub fn default_headers_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("refscreen").join(HEADERS_FILE))
    }

    pub fn has_authorization(&self) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case("authorization"))
    }

    /// Attach the session headers to a request.
    pub fn apply(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        request
    }
}
