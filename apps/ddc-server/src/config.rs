//! Configuration management for DDC Server

use std::env;
use std::path::PathBuf;

use crate::scanner::ClamdEndpoint;

/// Default request body limit for `/rpc`: 64MB
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub clamd: ClamdConfig,
    pub rpc: RpcConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClamdNetwork {
    Unix,
    Tcp,
}

#[derive(Debug, Clone)]
pub struct ClamdConfig {
    pub network: ClamdNetwork,
    /// Socket path or `host:port`; `None` disables scanning
    pub socket: Option<String>,
}

impl ClamdConfig {
    pub fn endpoint(&self) -> Option<ClamdEndpoint> {
        let socket = self.socket.as_ref()?;
        Some(match self.network {
            ClamdNetwork::Unix => ClamdEndpoint::Unix(PathBuf::from(socket)),
            ClamdNetwork::Tcp => ClamdEndpoint::Tcp(socket.clone()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub max_body_bytes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 4567,
            },
            clamd: ClamdConfig {
                network: ClamdNetwork::Unix,
                socket: None,
            },
            rpc: RpcConfig {
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from any variable source
    ///
    /// An invalid value falls back to the default of that variable alone and
    /// is logged; the other variables are unaffected.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let port = or_default(parse_port(lookup("SERVER_PORT")), defaults.server.port);
        let network = or_default(parse_network(lookup("CLAMD_NETWORK")), defaults.clamd.network);
        let max_body_bytes = or_default(
            parse_body_limit(lookup("RPC_MAX_BODY_BYTES")),
            defaults.rpc.max_body_bytes,
        );

        Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
            },
            clamd: ClamdConfig {
                network,
                socket: lookup("CLAMD_SOCKET").filter(|s| !s.trim().is_empty()),
            },
            rpc: RpcConfig { max_body_bytes },
        }
    }
}

fn or_default<T>(parsed: Result<Option<T>, ConfigError>, default: T) -> T {
    match parsed {
        Ok(value) => value.unwrap_or(default),
        Err(e) => {
            tracing::warn!("{}, using the default", e);
            default
        }
    }
}

fn parse_port(value: Option<String>) -> Result<Option<u16>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
            var: "SERVER_PORT",
            reason: e.to_string(),
            value,
        })
}

fn parse_network(value: Option<String>) -> Result<Option<ClamdNetwork>, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("unix") => Ok(Some(ClamdNetwork::Unix)),
        Some("tcp") => Ok(Some(ClamdNetwork::Tcp)),
        Some(other) => Err(ConfigError::InvalidValue {
            var: "CLAMD_NETWORK",
            value: other.to_string(),
            reason: "expected 'unix' or 'tcp'".to_string(),
        }),
    }
}

fn parse_body_limit(value: Option<String>) -> Result<Option<usize>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(Some(limit)),
        _ => Err(ConfigError::InvalidValue {
            var: "RPC_MAX_BODY_BYTES",
            value,
            reason: "expected a positive byte count".to_string(),
        }),
    }
}
