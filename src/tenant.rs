//! Per-client branding and entity configuration, keyed by hostname.

use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A sub-organization whose data is scoped separately (a mosque, a graveyard).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub name: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub receipt_footer: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

fn default_title() -> String {
    "Trust Ledger".to_string()
}

fn default_currency() -> String {
    "৳".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_title(),
            title: default_title(),
            tagline: String::new(),
            address: String::new(),
            phone: String::new(),
            currency: default_currency(),
            receipt_footer: String::new(),
            entities: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// The entity requests are scoped to: the selected one while it is still
    /// configured, otherwise the first configured entity.
    pub fn active_entity(&self, selected: Option<&str>) -> Option<&Entity> {
        selected
            .and_then(|id| self.entity(id))
            .or_else(|| self.entities.first())
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct TenantRegistry {
    #[serde(default)]
    pub default: ClientConfig,
    #[serde(default)]
    pub clients: HashMap<String, ClientConfig>,
}

impl TenantRegistry {
    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Load the registry, falling back to the built-in default client when
    /// the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!(
                "Client config {} not found, using default branding",
                path.display()
            );
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let registry = Self::from_toml(&raw)?;
        log::info!(
            "Loaded {} client configuration(s) from {}",
            registry.clients.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Look a host up by full hostname, then by its client label, then fall
    /// back to the default client.
    pub fn lookup(&self, host: &str) -> &ClientConfig {
        let hostname = strip_port(host);
        self.clients
            .get(hostname)
            .or_else(|| self.clients.get(client_label(host)))
            .unwrap_or(&self.default)
    }
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6 literal
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

/// First DNS label of the host, sent to the backend as `X-Client`.
pub fn client_label(host: &str) -> &str {
    let hostname = strip_port(host);
    hostname.split('.').next().unwrap_or(hostname)
}
