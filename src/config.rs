//! Configuration management for the matrix server

use crate::error::{MatrixError, Result};
use crate::models::MatrixName;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Configuration for the matrix server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root data folder; each model lives in a sub-folder (default: "data")
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Address the API server binds to (default: "127.0.0.1:8080")
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Explicit model list. When empty every sub-folder of `data_dir` is
    /// served as a model named after the folder.
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Matrix and grid names decoded for every model at startup
    #[serde(default)]
    pub preload: Vec<String>,

    /// Metrics endpoint configuration (optional)
    #[serde(default)]
    pub metrics_endpoint: Option<MetricsEndpointConfig>,
}

/// One explicitly configured model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Identifier used in request paths
    pub id: String,

    /// Display name (default: the id)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Data folder, relative to `data_dir` unless absolute (default: the id)
    #[serde(default)]
    pub folder: Option<String>,
}

/// Configuration for the metrics HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsEndpointConfig {
    /// Whether to enable the metrics endpoint (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Address to bind the metrics endpoint to (default: "127.0.0.1:9090")
    #[serde(default = "default_metrics_address")]
    pub address: String,
}

impl Default for MetricsEndpointConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: default_metrics_address(),
        }
    }
}

// Default value functions for serde
fn default_data_dir() -> String {
    "data".to_string()
}

fn default_listen_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_address() -> String {
    "127.0.0.1:9090".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            data_dir: default_data_dir(),
            listen_address: default_listen_address(),
            models: Vec::new(),
            preload: Vec::new(),
            metrics_endpoint: None,
        }
    }
}

impl ModelConfig {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Resolve the model folder against the data directory
    pub fn resolve_folder(&self, data_dir: &Path) -> PathBuf {
        let folder = Path::new(self.folder.as_deref().unwrap_or(&self.id));
        if folder.is_absolute() {
            folder.to_path_buf()
        } else {
            data_dir.join(folder)
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` if loading and validation succeed
    /// * `Err(MatrixError::ConfigError)` if the file cannot be read or the
    ///   config is invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            MatrixError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: ServerConfig = serde_yaml::from_str(&content).map_err(|e| {
            MatrixError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Validation Rules
    /// - data_dir must not be empty
    /// - listen_address (and the metrics address when enabled) must be a
    ///   socket address
    /// - model ids must be non-empty and unique
    /// - every preload entry must name a known matrix or grid
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(MatrixError::ConfigError(
                "data_dir must not be empty".to_string(),
            ));
        }

        self.listen_addr()?;
        self.metrics_addr()?;

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.id.trim().is_empty() {
                return Err(MatrixError::ConfigError(
                    "model id must not be empty".to_string(),
                ));
            }
            if model.id.contains('/') {
                return Err(MatrixError::ConfigError(format!(
                    "model id '{}' must not contain '/'",
                    model.id
                )));
            }
            if !seen.insert(model.id.as_str()) {
                return Err(MatrixError::ConfigError(format!(
                    "duplicate model id '{}'",
                    model.id
                )));
            }
        }

        for name in &self.preload {
            name.parse::<MatrixName>().map_err(|_| {
                MatrixError::ConfigError(format!("unknown preload matrix '{}'", name))
            })?;
        }

        Ok(())
    }

    /// Parsed API listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen_address.parse().map_err(|e| {
            MatrixError::ConfigError(format!(
                "invalid listen_address '{}': {}",
                self.listen_address, e
            ))
        })
    }

    /// Parsed metrics address, or `None` when the endpoint is disabled
    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        match &self.metrics_endpoint {
            Some(endpoint) if endpoint.enabled => endpoint
                .address
                .parse()
                .map(Some)
                .map_err(|e| {
                    MatrixError::ConfigError(format!(
                        "invalid metrics_endpoint address '{}': {}",
                        endpoint.address, e
                    ))
                }),
            _ => Ok(None),
        }
    }

    /// Parsed preload list
    pub fn preload_names(&self) -> Result<Vec<MatrixName>> {
        self.preload.iter().map(|name| name.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.listen_address, "127.0.0.1:8080");
        assert!(config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
data_dir: /srv/useeio
listen_address: "0.0.0.0:5000"
models:
  - id: USEEIOv2.0
    name: "USEEIO v2.0"
  - id: test
    folder: fixtures/test
preload: [A, B_dqi]
metrics_endpoint:
  enabled: true
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[0].display_name(), "USEEIO v2.0");
        assert_eq!(config.models[1].display_name(), "test");
        assert_eq!(
            config.models[1].resolve_folder(Path::new(&config.data_dir)),
            PathBuf::from("/srv/useeio/fixtures/test")
        );
        assert_eq!(config.preload_names().unwrap().len(), 2);
        assert_eq!(
            config.metrics_addr().unwrap(),
            Some("127.0.0.1:9090".parse().unwrap())
        );
    }

    #[test]
    fn test_invalid_empty_data_dir() {
        let config = ServerConfig {
            data_dir: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_listen_address() {
        let config = ServerConfig {
            listen_address: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MatrixError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_preload() {
        let config = ServerConfig {
            preload: vec!["A".to_string(), "Z".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_model_ids() {
        let model = ModelConfig {
            id: "m".to_string(),
            name: None,
            description: None,
            folder: None,
        };
        let config = ServerConfig {
            models: vec![model.clone(), model],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_metrics_endpoint_is_not_parsed() {
        let config = ServerConfig {
            metrics_endpoint: Some(MetricsEndpointConfig {
                enabled: false,
                address: "not an address".to_string(),
            }),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.metrics_addr().unwrap(), None);
    }
}
