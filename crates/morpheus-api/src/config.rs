//! Connection settings

use crate::error::{Error, Result};
use std::env;

pub const HOST_ENV: &str = "MORPHEUS_HOST";
pub const TOKEN_ENV: &str = "MORPHEUS_TOKEN";
pub const SSL_VERIFY_ENV: &str = "MORPHEUS_SSL_VERIFY";

/// Where and how to reach the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Host name, without scheme
    pub host: String,
    /// Bearer token
    pub token: String,
    pub verify_ssl: bool,
}

impl ClientConfig {
    /// Build a config from optional parts, failing on the ones missing.
    pub fn from_parts(host: Option<String>, token: Option<String>, verify_ssl: bool) -> Result<Self> {
        let host = host.filter(|h| !h.is_empty());
        let token = token.filter(|t| !t.is_empty());
        match (host, token) {
            (Some(host), Some(token)) => Ok(Self {
                host: host.replace("https://", ""),
                token,
                verify_ssl,
            }),
            (host, token) => {
                let missing: Vec<&str> = [("host", host.is_none()), ("token", token.is_none())]
                    .into_iter()
                    .filter_map(|(name, missing)| missing.then_some(name))
                    .collect();
                Err(Error::MissingConfig(missing.join(", ")))
            }
        }
    }

    /// Read `MORPHEUS_HOST`, `MORPHEUS_TOKEN` and `MORPHEUS_SSL_VERIFY`.
    pub fn from_env() -> Result<Self> {
        let verify_ssl = env::var(SSL_VERIFY_ENV).map_or(true, |v| v != "FALSE");
        Self::from_parts(env::var(HOST_ENV).ok(), env::var(TOKEN_ENV).ok(), verify_ssl)
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_strips_scheme() {
        let config =
            ClientConfig::from_parts(Some("https://morpheus.local".into()), Some("abc".into()), true).unwrap();
        assert_eq!(config.host, "morpheus.local");
        assert_eq!(config.base_url(), "https://morpheus.local");
        assert!(config.verify_ssl);
    }

    #[test]
    fn test_from_parts_missing() {
        let err = ClientConfig::from_parts(None, None, true).unwrap_err();
        assert_eq!(err.to_string(), "missing config: host, token required");

        let err = ClientConfig::from_parts(Some("h".into()), Some(String::new()), true).unwrap_err();
        assert_eq!(err.to_string(), "missing config: token required");
    }
}
