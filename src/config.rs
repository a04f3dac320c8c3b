use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_AUTH_SERVICE_URL: &str = "https://kbase.us/services/authorization/Sessions/Login";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub service_name: String,
    pub auth_service_url: String,
    pub auth_timeout: Duration,
    pub max_body_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("KB_SERVICE_NAME must not be empty")]
    EmptyServiceName,
    #[error("KB_AUTH_SERVICE_URL must be an http(s) URL")]
    InvalidAuthServiceUrl,
    #[error("KB_AUTH_TIMEOUT_SECS must be a positive integer")]
    InvalidAuthTimeout,
    #[error("MAX_BODY_BYTES must be a positive integer")]
    InvalidMaxBodyBytes,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = var("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(9999);

        let service_name = match lookup("KB_SERVICE_NAME") {
            Some(value) if value.trim().is_empty() => return Err(ConfigError::EmptyServiceName),
            Some(value) => value.trim().to_string(),
            None => "fbaModelServices".to_string(),
        };

        let auth_service_url =
            var("KB_AUTH_SERVICE_URL").unwrap_or_else(|| DEFAULT_AUTH_SERVICE_URL.to_string());
        if !(auth_service_url.starts_with("http://") || auth_service_url.starts_with("https://")) {
            return Err(ConfigError::InvalidAuthServiceUrl);
        }

        let auth_timeout_secs = var("KB_AUTH_TIMEOUT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidAuthTimeout)
            })
            .transpose()?
            .unwrap_or(30);

        let max_body_bytes = var("MAX_BODY_BYTES")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|bytes| *bytes > 0)
                    .ok_or(ConfigError::InvalidMaxBodyBytes)
            })
            .transpose()?
            .unwrap_or(64 * 1024 * 1024);

        let config = Self {
            bind_addr,
            bind_port,
            service_name,
            auth_service_url,
            auth_timeout: Duration::from_secs(auth_timeout_secs),
            max_body_bytes,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
