//! Configuration management for passkeep
//!
//! Configuration file: ~/.config/passkeep/config.json
//!
//! Environment overrides (applied after the file):
//! - PASSKEEP_NAMESPACE - vault namespace (service name)
//! - PASSKEEP_BACKEND   - "keyring" or "memory"

use crate::paths::Paths;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Namespace used when nothing else is configured
pub const DEFAULT_NAMESPACE: &str = "passkeep";

pub const ENV_NAMESPACE: &str = "PASSKEEP_NAMESPACE";
pub const ENV_BACKEND: &str = "PASSKEEP_BACKEND";

/// Which secret store the vault adapter is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The OS credential store (Keychain, Credential Manager, keyutils)
    #[default]
    Keyring,
    /// Process-local store, gone when the process exits
    Memory,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Keyring => "keyring",
            BackendKind::Memory => "memory",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Ok(BackendKind::Keyring),
            "memory" => Ok(BackendKind::Memory),
            other => bail!("Unknown backend '{}' (expected 'keyring' or 'memory')", other),
        }
    }
}

/// Global passkeep configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Service name every vault entry is filed under
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Backend to store passphrases in
    #[serde(default)]
    pub backend: BackendKind,

    /// Resolve existing file paths to their canonical form before use as keys
    #[serde(default = "default_canonicalize_paths")]
    pub canonicalize_paths: bool,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_canonicalize_paths() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            backend: BackendKind::default(),
            canonicalize_paths: default_canonicalize_paths(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let paths = Paths::new();
        Self::load_from(&paths.config_file())?.with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", path))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides looked up through `var` (normally `std::env::var`)
    pub fn with_env_overrides<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(namespace) = var(ENV_NAMESPACE) {
            self.namespace = namespace;
        }
        if let Some(backend) = var(ENV_BACKEND) {
            self.backend = backend
                .parse()
                .with_context(|| format!("Invalid {}", ENV_BACKEND))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            bail!("Namespace cannot be empty");
        }
        Ok(())
    }
}
