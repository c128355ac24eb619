//! Static client configuration: where the hosted backend lives and which
//! table the client mirrors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Filter;

/// Error returned when a configuration is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("backend url must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),
    #[error("public api key is empty")]
    MissingKey,
    #[error("{0} must not be empty")]
    EmptyName(&'static str),
    #[error("could not parse configuration: {0}")]
    Parse(String),
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "things".to_string()
}

/// Connection endpoint, public key, and the mirrored table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub url: String,
    pub anon_key: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl ClientConfig {
    /// Configuration for the `public.things` table.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            schema: default_schema(),
            table: default_table(),
        }
    }

    /// Configuration for the bundled in-memory stack.
    pub fn local() -> Self {
        Self::new("http://localhost:54321", "local-anon-key")
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }
        if self.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if self.schema.trim().is_empty() {
            return Err(ConfigError::EmptyName("schema"));
        }
        if self.table.trim().is_empty() {
            return Err(ConfigError::EmptyName("table"));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Realtime channel name for the table, optionally scoped by a filter.
    ///
    /// `public:things` or `public:things:owner=eq.<id>`.
    pub fn channel_name(&self, filter: Option<&Filter>) -> String {
        match filter {
            Some(filter) => format!("{}:{}:{}", self.schema, self.table, filter),
            None => format!("{}:{}", self.schema, self.table),
        }
    }
}
