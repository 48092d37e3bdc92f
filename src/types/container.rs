use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Lifecycle status of a container. Closed set; anything the engine sends
/// that is not recognised becomes [`ContainerStatus::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Exited,
    Removing,
    Dead,
    #[default]
    Unknown,
}

impl ContainerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Restarting => "restarting",
            ContainerStatus::Exited => "exited",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Unknown => "unknown",
        }
    }
}

impl From<&str> for ContainerStatus {
    fn from(status: &str) -> Self {
        match status {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "paused" => ContainerStatus::Paused,
            "restarting" => ContainerStatus::Restarting,
            "exited" => ContainerStatus::Exited,
            "removing" => ContainerStatus::Removing,
            "dead" => ContainerStatus::Dead,
            _ => ContainerStatus::Unknown,
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub created: String,
    pub path: String,
    pub args: Vec<String>,
    pub image: String,
    pub state: ContainerState,
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    pub network_settings: NetworkSettings,
    pub mounts: Vec<Mount>,
    pub graph_driver: GraphDriver,
    pub image_manifest_descriptor: ImageManifestDescriptor,
    pub restart_count: i64,
    pub driver: String,
    pub platform: String,
    pub log_path: String,
    pub hostname_path: String,
    pub hosts_path: String,
    pub resolv_conf_path: String,
    pub mount_label: String,
    pub process_label: String,
    pub app_armor_profile: String,
    pub exec_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerState {
    pub status: ContainerStatus,
    pub running: bool,
    pub paused: bool,
    pub restarting: bool,
    pub oom_killed: bool,
    pub dead: bool,
    pub pid: i64,
    pub exit_code: i64,
    pub error: String,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerConfig {
    pub hostname: String,
    pub domainname: String,
    pub user: String,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub tty: bool,
    pub open_stdin: bool,
    pub stdin_once: bool,
    pub env: Vec<String>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub working_dir: String,
    pub on_build: Vec<String>,
    pub exposed_ports: Vec<String>,
    pub volumes: Vec<String>,
}

/// Resource limits and runtime options of a container.
///
/// `memory_swappiness`, `oom_kill_disable` and `pids_limit` are `None` when
/// the engine reports them unset, which is not the same as zero / false.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostConfig {
    pub cpu_shares: i64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub cpu_realtime_period: i64,
    pub cpu_realtime_runtime: i64,
    pub cpu_count: i64,
    pub cpu_percent: i64,
    pub nano_cpus: i64,
    pub cpuset_cpus: String,
    pub cpuset_mems: String,
    pub memory: i64,
    pub memory_reservation: i64,
    pub memory_swap: i64,
    pub memory_swappiness: Option<i64>,
    pub oom_kill_disable: Option<bool>,
    pub oom_score_adj: i64,
    pub pids_limit: Option<i64>,
    pub blkio_weight: i64,
    pub io_maximum_bandwidth: i64,
    pub io_maximum_iops: i64,
    pub devices: Vec<DeviceMapping>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub restart_policy: RestartPolicy,
    pub port_bindings: HashMap<String, Vec<PortBinding>>,
    pub binds: Vec<String>,
    pub dns: Vec<String>,
    pub dns_options: Vec<String>,
    pub dns_search: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub group_add: Vec<String>,
    pub links: Vec<String>,
    pub masked_paths: Vec<String>,
    pub readonly_paths: Vec<String>,
    pub log_config: LogConfig,
    pub security_opt: Vec<String>,
    pub ulimits: Vec<Ulimit>,
    pub network_mode: String,
    pub ipc_mode: String,
    pub pid_mode: String,
    pub uts_mode: String,
    pub userns_mode: String,
    pub cgroupns_mode: String,
    pub cgroup: String,
    pub cgroup_parent: String,
    pub isolation: String,
    pub runtime: String,
    pub shm_size: i64,
    pub volume_driver: String,
    pub volumes_from: Vec<String>,
    pub container_id_file: String,
    pub auto_remove: bool,
    pub privileged: bool,
    pub publish_all_ports: bool,
    pub readonly_rootfs: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceMapping {
    pub path_on_host: String,
    pub path_in_container: String,
    pub cgroup_permissions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestartPolicy {
    pub name: String,
    pub maximum_retry_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    pub log_type: String,
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ulimit {
    pub name: String,
    pub soft: i64,
    pub hard: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSettings {
    pub bridge: String,
    pub sandbox_id: String,
    pub sandbox_key: String,
    pub hairpin_mode: bool,
    pub link_local_ipv6_address: String,
    pub link_local_ipv6_prefix_len: i64,
    pub endpoint_id: String,
    pub gateway: String,
    pub ip_address: String,
    pub ip_prefix_len: i64,
    pub ipv6_gateway: String,
    pub global_ipv6_address: String,
    pub global_ipv6_prefix_len: i64,
    pub mac_address: String,
    pub secondary_ip_addresses: Vec<String>,
    pub secondary_ipv6_addresses: Vec<String>,
    pub ports: HashMap<String, Vec<PortBinding>>,
    /// Attached networks by name. The names refer to networks; the container
    /// does not own them.
    pub networks: HashMap<String, EndpointSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EndpointSettings {
    pub network_id: String,
    pub endpoint_id: String,
    pub gateway: String,
    pub ip_address: String,
    pub ip_prefix_len: i64,
    pub ipv6_gateway: String,
    pub global_ipv6_address: String,
    pub global_ipv6_prefix_len: i64,
    pub mac_address: String,
    pub gw_priority: i64,
    pub aliases: Vec<String>,
    pub links: Vec<String>,
    pub dns_names: Vec<String>,
    pub driver_opts: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Mount {
    pub mount_type: String,
    pub name: String,
    pub source: String,
    pub destination: String,
    pub driver: String,
    pub mode: String,
    pub rw: bool,
    pub propagation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphDriver {
    pub name: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageManifestDescriptor {
    pub media_type: String,
    pub digest: String,
    pub size: i64,
    pub architecture: String,
    pub os: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    /// First entry of `names`, without the leading `/`.
    pub name: String,
    pub names: Vec<String>,
    pub image: String,
    pub image_id: String,
    pub command: String,
    pub state: ContainerStatus,
    pub status: String,
    pub created: i64,
    pub labels: HashMap<String, String>,
    pub ports: Vec<Port>,
    pub networks: HashMap<String, EndpointSettings>,
    pub mounts: Vec<Mount>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Port {
    pub ip: String,
    pub private_port: u16,
    pub public_port: u16,
    pub port_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCreateRequest {
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub exposed_ports: HashMap<String, serde_json::Map<String, serde_json::Value>>,
    pub tty: bool,
    pub open_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_config: Option<HostConfigCreate>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfigCreate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binds: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub port_bindings: HashMap<String, Vec<PortBindingCreate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nano_cpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicyCreate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_drop: Vec<String>,
    pub auto_remove: bool,
    pub privileged: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PortBindingCreate {
    #[serde(rename = "HostIp")]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RestartPolicyCreate {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MaximumRetryCount")]
    pub maximum_retry_count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerListOptions {
    pub all: bool,
    /// Only the most recently created containers, `None` for no limit.
    pub limit: Option<u32>,
    pub size: bool,
    pub filters: super::Filters,
}

#[derive(Debug, Clone)]
pub struct LogsOptions {
    pub stdout: bool,
    pub stderr: bool,
    pub timestamps: bool,
    pub since: i64,
    pub until: i64,
    /// Number of lines from the end, or `"all"`.
    pub tail: String,
}

impl Default for LogsOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            timestamps: false,
            since: 0,
            until: 0,
            tail: "all".to_string(),
        }
    }
}
