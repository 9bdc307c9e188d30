//! Server configuration.
//!
//! Loaded from a YAML file (JSON works too, being a YAML subset). Every field
//! has a default, so an empty file is a valid configuration.
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 8080
//! history_capacity: 500
//! failed_capacity: 100
//! standing_defaults:
//!   - request: { method: GET, path: /health }
//!     response: { statusCode: 200, body: { type: string, value: up } }
//! ```

use crate::dispatcher::{Dispatcher, DEFAULT_LOG_CAPACITY};
use crate::matcher::validate_pattern;
use crate::model::{Request, Response};
use crate::priming::QueueDefault;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Capacity of the served-exchange history.
    #[serde(default = "default_log_capacity")]
    pub history_capacity: usize,
    /// Capacity of the unmatched-request log.
    #[serde(default = "default_log_capacity")]
    pub failed_capacity: usize,
    /// Default primings that survive a reset.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub standing_defaults: Vec<StandingDefaultConfig>,
}

/// A pattern and the response it answers with until the server stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingDefaultConfig {
    pub request: Request,
    pub response: Response,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            history_capacity: default_log_capacity(),
            failed_capacity: default_log_capacity(),
            standing_defaults: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.history_capacity == 0 {
            anyhow::bail!("history_capacity must be greater than zero");
        }
        if self.failed_capacity == 0 {
            anyhow::bail!("failed_capacity must be greater than zero");
        }
        for (index, standing) in self.standing_defaults.iter().enumerate() {
            if let Err(e) = validate_pattern(&standing.request) {
                anyhow::bail!("standing_defaults[{}]: {}", index, e);
            }
        }
        Ok(())
    }

    /// Address to bind the listener to.
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address '{}': {}", addr, e))
    }

    /// Build a dispatcher with this configuration's capacities and standing defaults.
    pub fn build_dispatcher(&self) -> Dispatcher {
        let standing = self
            .standing_defaults
            .iter()
            .map(|s| (s.request.clone(), QueueDefault::Value(s.response.clone())))
            .collect();
        Dispatcher::with_standing_defaults(self.history_capacity, self.failed_capacity, standing)
    }
}
