use crate::cli::CLI;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";
pub const DEFAULT_TCP_PORT: u16 = 2375;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

impl Endpoint {
    pub fn host_header(&self) -> String {
        match self {
            Endpoint::Unix(_) => "localhost".to_string(),
            Endpoint::Tcp { host, port } => format!("{host}:{port}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Accepts `unix:///path`, `/path`, `tcp://host:port`, `http://host:port`
    /// and `host:port`. The port defaults to 2375.
    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(path) = value.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::Config("unix endpoint without a socket path".to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if value.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(value)));
        }

        let address = value
            .strip_prefix("tcp://")
            .or_else(|| value.strip_prefix("http://"))
            .unwrap_or(value)
            .trim_end_matches('/');
        if address.contains("://") {
            return Err(Error::Config(format!("unsupported endpoint scheme in {value:?}")));
        }

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("invalid port in endpoint {value:?}")))?;
                (host, port)
            }
            None => (address, DEFAULT_TCP_PORT),
        };
        if host.is_empty() {
            return Err(Error::Config(format!("endpoint {value:?} has no host")));
        }

        Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Endpoint,
    /// Engine API version such as `1.43`. When set, every request path is
    /// prefixed with `/v{version}`.
    pub api_version: Option<String>,
}

impl Config {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            api_version: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn api_prefix(&self) -> String {
        match &self.api_version {
            Some(version) => format!("/v{version}"),
            None => String::new(),
        }
    }

    pub fn from_env_and_cli(cli: &CLI) -> Result<Self> {
        let env_vars = read_env_file(&cli.env_file);

        // Priority: CLI args > .env file > default
        let endpoint = match cli
            .host
            .clone()
            .or_else(|| env_vars.get("DOCKER_HOST").cloned())
        {
            Some(host) => host.parse()?,
            None => Endpoint::default(),
        };

        let api_version = cli
            .api_version
            .clone()
            .or_else(|| env_vars.get("DOCKER_API_VERSION").cloned())
            .map(|version| normalize_version(&version))
            .transpose()?;

        Ok(Config {
            endpoint,
            api_version,
        })
    }

    pub fn show_configuration_help() {
        println!("Configuration options:");
        println!("  1. Command line flags:");
        println!("     dockhand --host unix:///var/run/docker.sock --api-version 1.43 --env-file .env ps --all");
        println!();
        println!("  2. Create a .env file (or use --env-file to specify a different file):");
        println!("     DOCKER_HOST=tcp://127.0.0.1:2375");
        println!("     DOCKER_API_VERSION=1.43");
        println!();
        println!("Accepted hosts: unix:///path, /path, tcp://host:port, http://host:port, host:port");
        println!("Command line flags take precedence over .env file values.");
    }
}

// Missing or unreadable files count as empty.
fn read_env_file(path: impl AsRef<Path>) -> HashMap<String, String> {
    let mut env_vars = HashMap::new();
    let Ok(content) = std::fs::read_to_string(path) else {
        return env_vars;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            env_vars.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    env_vars
}

fn normalize_version(version: &str) -> Result<String> {
    let version = version.trim().trim_start_matches('v');
    let valid = !version.is_empty()
        && version.split('.').all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if valid {
        Ok(version.to_string())
    } else {
        Err(Error::Config(format!("invalid API version {version:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints() {
        assert_eq!(
            "unix:///run/docker.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/run/docker.sock"))
        );
        assert_eq!(
            "/tmp/engine.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/engine.sock"))
        );
        assert_eq!(
            "tcp://10.0.0.2:2376".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp {
                host: "10.0.0.2".to_string(),
                port: 2376
            }
        );
        assert_eq!(
            "http://localhost".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp {
                host: "localhost".to_string(),
                port: DEFAULT_TCP_PORT
            }
        );
        assert_eq!(
            "engine:1234".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp {
                host: "engine".to_string(),
                port: 1234
            }
        );
    }

    #[test]
    fn test_parse_invalid_endpoints() {
        assert!("unix://".parse::<Endpoint>().is_err());
        assert!("tcp://host:notaport".parse::<Endpoint>().is_err());
        assert!("ssh://host".parse::<Endpoint>().is_err());
        assert!("tcp://:2375".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_api_prefix() {
        assert_eq!(Config::default().api_prefix(), "");
        assert_eq!(Config::default().with_api_version("1.43").api_prefix(), "/v1.43");
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("v1.41").unwrap(), "1.41");
        assert!(normalize_version("latest").is_err());
        assert!(normalize_version("1..2").is_err());
    }
}
