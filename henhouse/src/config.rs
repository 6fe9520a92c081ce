//! Configuration for Henhouse
//!
//! CLI arguments and environment variables via clap; deployment settings
//! (admin allowlist, channel cap, flow policy overrides, provider) from a
//! YAML file.

use clap::Parser;
use henhouse_genai::{GenerationError, GenerativeProvider, OpenAiProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::auth::AdminPolicy;
use crate::events::DEFAULT_MAX_SUBSCRIBERS;
use crate::flow::{FlowRegistry, HandlerErrorPolicy, RegistryError};

/// Henhouse - flow runner for the Henhouse farm platform
#[derive(Parser, Debug, Clone)]
#[command(name = "henhouse")]
#[command(about = "Run Henhouse flows against a seeded in-memory store")]
pub struct Args {
    /// Flow to run
    pub flow: Option<String>,

    /// Flow input as JSON
    #[arg(long, env = "HENHOUSE_INPUT", default_value = "{}")]
    pub input: String,

    /// List registered flows and exit
    #[arg(long)]
    pub list: bool,

    /// YAML configuration file
    #[arg(long, env = "HENHOUSE_CONFIG", default_value = "henhouse.yaml")]
    pub config: PathBuf,

    /// JSON seed file for the in-memory store and identity directory
    #[arg(long, env = "HENHOUSE_SEED")]
    pub seed: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Generative provider base URL (overrides the config file)
    #[arg(long, env = "PROVIDER_BASE_URL")]
    pub provider_url: Option<String>,

    /// Generative provider model (overrides the config file)
    #[arg(long, env = "PROVIDER_MODEL")]
    pub provider_model: Option<String>,

    /// Generative provider API key
    #[arg(long, env = "PROVIDER_API_KEY", hide_env_values = true)]
    pub provider_api_key: Option<String>,
}

impl Args {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if !self.list && self.flow.is_none() {
            return Err("a flow name is required unless --list is given".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Provider(#[from] GenerationError),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HenhouseConfig {
    pub admin: AdminConfig,
    #[serde(default)]
    pub events: EventsConfig,
    /// Per-flow overrides, keyed by flow name
    #[serde(default)]
    pub flows: BTreeMap<String, FlowOverride>,
    #[serde(default)]
    pub provider: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Verified emails allowed to run privileged flows
    #[serde(default)]
    pub allowed_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            max_subscribers: default_max_subscribers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowOverride {
    pub on_handler_error: HandlerErrorPolicy,
}

/// OpenAI-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

// Defaults
fn default_max_subscribers() -> usize { DEFAULT_MAX_SUBSCRIBERS }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "PROVIDER_API_KEY".to_string() }

impl HenhouseConfig {
    /// Load from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Check the configuration against the registered flows.
    pub fn validate(&self, registry: &FlowRegistry) -> Result<(), ConfigError> {
        if self.admin_policy().is_empty() {
            return Err(ConfigError::Invalid(
                "admin.allowed_emails must list at least one email".to_string(),
            ));
        }

        if self.events.max_subscribers == 0 {
            return Err(ConfigError::Invalid(
                "events.max_subscribers must be greater than zero".to_string(),
            ));
        }

        if let Some(unknown) = self.flows.keys().find(|name| !registry.contains(name)) {
            return Err(ConfigError::Invalid(format!(
                "flows.{} does not name a registered flow",
                unknown
            )));
        }

        Ok(())
    }

    pub fn admin_policy(&self) -> AdminPolicy {
        AdminPolicy::new(&self.admin.allowed_emails)
    }

    /// Apply per-flow policy overrides.
    pub fn apply_overrides(&self, registry: &mut FlowRegistry) -> Result<(), ConfigError> {
        for (name, flow) in &self.flows {
            registry.set_policy(name, flow.on_handler_error)?;
        }
        Ok(())
    }

    /// Build the generative provider, if one is configured.
    ///
    /// Command-line values take precedence over the file.
    pub fn build_provider(
        &self,
        args: &Args,
    ) -> Result<Option<Arc<dyn GenerativeProvider>>, ConfigError> {
        let base_url = args
            .provider_url
            .clone()
            .or_else(|| self.provider.as_ref().map(|p| p.base_url.clone()));
        let Some(base_url) = base_url else {
            return Ok(None);
        };

        let model = args
            .provider_model
            .clone()
            .or_else(|| self.provider.as_ref().map(|p| p.model.clone()))
            .unwrap_or_else(default_model);

        let api_key = args.provider_api_key.clone().or_else(|| {
            let var = self
                .provider
                .as_ref()
                .map(|p| p.api_key_env.clone())
                .unwrap_or_else(default_api_key_env);
            std::env::var(var).ok()
        });

        let provider = OpenAiProvider::new(base_url, model, api_key)?;
        Ok(Some(Arc::new(provider)))
    }
}
