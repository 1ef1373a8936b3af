//! Global configuration model for the control server.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{ControlError, Result};
use crate::types::PortPublishing;

/// Root configuration for the control server.
///
/// Every field has a default so a partial YAML file (or none at all) is
/// valid; the CLI layers flag and environment overrides on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Address the control server binds to.
    pub listen_addr: String,
    /// JSON file listing registered tenants.
    pub tenants_file: PathBuf,
    /// Image used for `create` and for records without a reported image.
    pub default_image: String,
    /// Explicit path to the `docker` binary; looked up on `PATH` when unset.
    pub docker_binary: Option<PathBuf>,
    /// I/O timeout for one engine call, in seconds.
    pub runtime_timeout_secs: u64,
    /// Shared secret used to sign and verify bearer tokens.
    pub jwt_secret: Option<String>,
    /// Lifetime of issued bearer tokens, in seconds.
    pub token_lifetime_secs: u64,
    /// Operators allowed to use the API. Empty admits any valid token.
    pub operators: Vec<String>,
    /// Host port base for created containers; tenant `n` is published on
    /// `base + n`. `null` publishes nothing.
    pub publish_port_base: Option<u16>,
    /// Port the tenant application listens on inside its container.
    pub container_port: u16,
    /// Seconds a control API connection may sit idle before it is closed.
    pub idle_timeout_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            listen_addr: constants::DEFAULT_LISTEN_ADDR.to_string(),
            tenants_file: PathBuf::from(constants::DEFAULT_TENANTS_FILE),
            default_image: constants::DEFAULT_IMAGE.to_string(),
            docker_binary: None,
            runtime_timeout_secs: constants::DEFAULT_RUNTIME_TIMEOUT_SECS,
            jwt_secret: None,
            token_lifetime_secs: constants::DEFAULT_TOKEN_LIFETIME_SECS,
            operators: Vec::new(),
            publish_port_base: Some(constants::DEFAULT_PUBLISH_PORT_BASE),
            container_port: constants::DEFAULT_CONTAINER_PORT,
            idle_timeout_secs: constants::DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl ControlConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for
    /// this model.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ControlError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ControlError::Config {
            message: format!("{}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path` if it exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Checks values that serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.runtime_timeout_secs == 0 {
            return Err(ControlError::Config {
                message: "runtime_timeout_secs must be greater than zero".into(),
            });
        }
        if self.default_image.trim().is_empty() {
            return Err(ControlError::Config {
                message: "default_image must not be empty".into(),
            });
        }
        if self.container_port == 0 {
            return Err(ControlError::Config {
                message: "container_port must be greater than zero".into(),
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ControlError::Config {
                message: "idle_timeout_secs must be greater than zero".into(),
            });
        }
        if self.jwt_secret.as_deref().is_some_and(str::is_empty) {
            return Err(ControlError::Config {
                message: "jwt_secret must not be empty when set".into(),
            });
        }
        Ok(())
    }

    /// Returns how created containers are published, if at all.
    #[must_use]
    pub fn publishing(&self) -> Option<PortPublishing> {
        self.publish_port_base.map(|host_base| PortPublishing {
            host_base,
            container_port: self.container_port,
        })
    }

    /// Returns the signing secret or a configuration error if none is set.
    ///
    /// # Errors
    ///
    /// Returns an error if no secret was configured.
    pub fn require_secret(&self) -> Result<&str> {
        self.jwt_secret.as_deref().ok_or_else(|| ControlError::Config {
            message: format!(
                "no token secret configured (set jwt_secret or {})",
                constants::JWT_SECRET_ENV
            ),
        })
    }
}
