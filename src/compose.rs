//! Compose file model.
//!
//! Compose files are hand written and loosely typed, so they go through the
//! same lenient decoder as engine responses instead of a strict serde model:
//! a mistyped entry falls back to its default and the rest of the file is
//! still used.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::decode::{Fields, Node};
use crate::error::Result;
use crate::mapper::{IpamKeys, ipam};
use crate::types::{Ipam, NetworkCreateRequest};

/// Services and networks of a compose file, keyed and ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposeModel {
    pub services: BTreeMap<String, ServiceSpec>,
    pub networks: BTreeMap<String, NetworkComposeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceSpec {
    pub image: String,
    pub container_name: String,
    pub restart: String,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub networks: Vec<String>,
    pub depends_on: Vec<String>,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkComposeSpec {
    pub driver: String,
    /// Managed outside this file; never created from it.
    pub external: bool,
    pub ipam: Ipam,
    pub labels: HashMap<String, String>,
    pub driver_opts: HashMap<String, String>,
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
    pub attachable: bool,
    pub internal: bool,
}

impl Default for NetworkComposeSpec {
    fn default() -> Self {
        Self {
            driver: "bridge".to_string(),
            external: false,
            ipam: Ipam {
                driver: "default".to_string(),
                ..Ipam::default()
            },
            labels: HashMap::new(),
            driver_opts: HashMap::new(),
            enable_ipv4: true,
            enable_ipv6: false,
            attachable: false,
            internal: false,
        }
    }
}

impl NetworkComposeSpec {
    pub fn to_create_request(&self, name: &str) -> NetworkCreateRequest {
        NetworkCreateRequest {
            driver: self.driver.clone(),
            ipam: self.ipam.clone(),
            labels: self.labels.clone(),
            options: self.driver_opts.clone(),
            enable_ipv4: self.enable_ipv4,
            enable_ipv6: self.enable_ipv6,
            attachable: self.attachable,
            internal: self.internal,
            ..NetworkCreateRequest::new(name)
        }
    }
}

pub fn parse_compose_file(path: impl AsRef<Path>) -> Result<ComposeModel> {
    let path = path.as_ref();
    debug!("Reading compose file {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_compose_str(&content)
}

/// Parses compose YAML. Only malformed YAML is an error; an empty document
/// or one without `services` / `networks` gives an empty model.
pub fn parse_compose_str(content: &str) -> Result<ComposeModel> {
    let doc: Value = serde_yaml::from_str(content)?;
    let root = Fields::new(&doc);

    Ok(ComposeModel {
        services: root.object_map("services", |node| Some(service(Fields::new(node)))),
        networks: root.object_map("networks", |node| Some(network(Fields::new(node)))),
    })
}

fn service(f: Fields<'_, Value>) -> ServiceSpec {
    ServiceSpec {
        image: f.string("image"),
        container_name: f.string("container_name"),
        restart: f.string("restart"),
        ports: f.array("ports", scalar),
        volumes: f.array("volumes", scalar),
        networks: names(f, "networks"),
        depends_on: names(f, "depends_on"),
        environment: environment(f),
    }
}

fn network(f: Fields<'_, Value>) -> NetworkComposeSpec {
    let defaults = NetworkComposeSpec::default();
    NetworkComposeSpec {
        driver: f.string_or("driver", &defaults.driver),
        // Legacy form `external: { name: ... }` also marks the network external.
        external: f.bool("external") || f.value("external").is_some_and(Node::is_map),
        ipam: match f.value("ipam") {
            Some(node) if node.is_map() => ipam(Fields::new(node), &IpamKeys::COMPOSE),
            _ => defaults.ipam,
        },
        labels: scalar_map(f, "labels"),
        driver_opts: scalar_map(f, "driver_opts"),
        enable_ipv4: f.bool_or("enable_ipv4", defaults.enable_ipv4),
        enable_ipv6: f.bool("enable_ipv6"),
        attachable: f.bool("attachable"),
        internal: f.bool("internal"),
    }
}

/// Scalars in string positions are read the way they are written
/// (`- 8080` and `- "8080"` are the same port).
fn scalar(node: &Value) -> Option<String> {
    match node {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_map<M>(f: Fields<'_, Value>, key: &str) -> M
where
    M: FromIterator<(String, String)>,
{
    f.object_map(key, scalar)
}

// `networks` and `depends_on` are a list of names or a map keyed by name.
fn names(f: Fields<'_, Value>, key: &str) -> Vec<String> {
    match f.value(key) {
        Some(node) if node.is_map() => f.keys(key),
        _ => f.array(key, scalar),
    }
}

// Either `KEY: value` or a list of `KEY=value`. A key without a value maps to
// an empty string.
fn environment(f: Fields<'_, Value>) -> BTreeMap<String, String> {
    match f.value("environment") {
        Some(node) if node.is_map() => f.object_map("environment", |value| {
            Some(if value.is_null() {
                String::new()
            } else {
                scalar(value)?
            })
        }),
        _ => f
            .array("environment", scalar)
            .into_iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (entry, String::new()),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document() {
        assert_eq!(parse_compose_str("").unwrap(), ComposeModel::default());
        assert_eq!(parse_compose_str("version: '3'").unwrap(), ComposeModel::default());
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(parse_compose_str("services: [unclosed").is_err());
    }

    #[test]
    fn test_network_without_body_uses_defaults() {
        let model = parse_compose_str("networks:\n  backend:\n").unwrap();
        assert_eq!(model.networks["backend"], NetworkComposeSpec::default());
    }

    #[test]
    fn test_environment_key_without_value() {
        let model = parse_compose_str("services:\n  a:\n    environment:\n      - DEBUG\n      - MODE=prod=1\n").unwrap();
        let env = &model.services["a"].environment;
        assert_eq!(env["DEBUG"], "");
        assert_eq!(env["MODE"], "prod=1");
    }
}
