use serde::Serialize;
use std::collections::HashMap;

/// Declarative part of a network, shared by inspect responses and what the
/// compose path asks the engine to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkSpec {
    pub name: String,
    pub id: String,
    pub driver: String,
    pub scope: String,
    pub enable_ipv4: bool,
    pub enable_ipv6: bool,
    pub ipam: Ipam,
    pub internal: bool,
    pub attachable: bool,
    pub ingress: bool,
    /// Name of the config-only network this one takes its config from.
    pub config_from: String,
    pub config_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkRecord {
    pub spec: NetworkSpec,
    pub created: String,
    /// Attached containers keyed by container id.
    pub containers: HashMap<String, NetworkContainer>,
    pub labels: HashMap<String, String>,
    pub options: HashMap<String, String>,
    pub peers: Vec<Peer>,
}

impl NetworkRecord {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ipam {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Config")]
    pub config: Vec<IpamConfig>,
    #[serde(rename = "Options", skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpamConfig {
    #[serde(rename = "Subnet", skip_serializing_if = "String::is_empty")]
    pub subnet: String,
    #[serde(rename = "IPRange", skip_serializing_if = "String::is_empty")]
    pub ip_range: String,
    #[serde(rename = "Gateway", skip_serializing_if = "String::is_empty")]
    pub gateway: String,
    #[serde(rename = "AuxiliaryAddresses", skip_serializing_if = "HashMap::is_empty")]
    pub aux_addresses: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkContainer {
    pub name: String,
    pub endpoint_id: String,
    pub mac_address: String,
    pub ipv4_address: String,
    pub ipv6_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub name: String,
    pub ip: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkCreateRequest {
    pub name: String,
    pub driver: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
    pub internal: bool,
    pub attachable: bool,
    pub ingress: bool,
    pub config_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_from: Option<ConfigFrom>,
    #[serde(rename = "IPAM")]
    pub ipam: Ipam,
    #[serde(rename = "EnableIPv4")]
    pub enable_ipv4: bool,
    #[serde(rename = "EnableIPv6")]
    pub enable_ipv6: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl NetworkCreateRequest {
    /// A bridge network with the default IPAM driver.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: "bridge".to_string(),
            scope: String::new(),
            internal: false,
            attachable: false,
            ingress: false,
            config_only: false,
            config_from: None,
            ipam: Ipam {
                driver: "default".to_string(),
                ..Ipam::default()
            },
            enable_ipv4: true,
            enable_ipv6: false,
            options: HashMap::new(),
            labels: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigFrom {
    #[serde(rename = "Network")]
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkCreated {
    pub id: String,
    pub warning: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointConfig {
    #[serde(rename = "IPAMConfig", skip_serializing_if = "Option::is_none")]
    pub ipam_config: Option<EndpointIpamConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub driver_opts: HashMap<String, String>,
    #[serde(rename = "DNSNames", skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    pub gw_priority: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointIpamConfig {
    #[serde(rename = "IPv4Address", skip_serializing_if = "String::is_empty")]
    pub ipv4_address: String,
    #[serde(rename = "IPv6Address", skip_serializing_if = "String::is_empty")]
    pub ipv6_address: String,
    #[serde(rename = "LinkLocalIPs", skip_serializing_if = "Vec::is_empty")]
    pub link_local_ips: Vec<String>,
}
