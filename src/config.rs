use anyhow::{Context, Result};
use morpheus_api::ClientConfig;
use morpheus_api::config::SSL_VERIFY_ENV;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the default settings file path
pub fn default_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("morpheus-deploy").join("config.toml"))
}

// ============================================================================
// Settings file
// ============================================================================

/// Optional TOML settings, overridden by environment and flags
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub verify_ssl: Option<bool>,
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit path must exist; the default path is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (expand_path(path), true),
            None => (default_path()?, false),
        };

        if !required && !path.exists() {
            log::debug!("no settings file at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge with flag/environment values into a client config.
    ///
    /// Flags and environment win over the file. TLS verification is off when
    /// any layer turns it off.
    pub fn client_config(&self, host: Option<String>, token: Option<String>, insecure: bool) -> Result<ClientConfig> {
        let env_verify = env::var(SSL_VERIFY_ENV).map_or(true, |v| v != "FALSE");
        let verify_ssl = !insecure && env_verify && self.verify_ssl.unwrap_or(true);

        let config = ClientConfig::from_parts(
            host.or_else(|| self.host.clone()),
            token.or_else(|| self.token.clone()),
            verify_ssl,
        )?;
        Ok(config)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    PathBuf::from(expanded)
}
