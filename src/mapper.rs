//! Engine documents to domain values.
//!
//! Every `map_*` function is total: an undecodable document becomes the zero
//! value of its entity. The `try_*` variants fail only when the root is not an
//! object or an identity field carries the wrong wire type; list mapping uses
//! them to drop a bad element without losing the others.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::decode::{Batch, DecodeError, Fields, Node, decode_batch, each_object};
use crate::types::{
    ContainerConfig, ContainerRecord, ContainerState, ContainerStatus, ContainerSummary,
    DeviceMapping, EndpointSettings, GraphDriver, HostConfig, ImageHistoryEntry,
    ImageManifestDescriptor, ImageRecord, ImageRemoved, Ipam, IpamConfig, LogConfig, Mount,
    NetworkContainer, NetworkCreated, NetworkRecord, NetworkSettings, NetworkSpec, Peer, Port,
    PortBinding, RestartPolicy, Ulimit,
};

pub fn map_container(doc: &Value) -> ContainerRecord {
    or_zero("container", try_container(doc))
}

pub fn map_container_summary(doc: &Value) -> ContainerSummary {
    or_zero("container summary", try_container_summary(doc))
}

pub fn map_image(doc: &Value) -> ImageRecord {
    or_zero("image", try_image(doc))
}

pub fn map_image_history_entry(doc: &Value) -> ImageHistoryEntry {
    or_zero("image history entry", try_image_history_entry(doc))
}

pub fn map_network(doc: &Value) -> NetworkRecord {
    or_zero("network", try_network(doc))
}

pub fn map_container_list(doc: &Value) -> Batch<ContainerSummary> {
    decode_batch(doc, try_container_summary)
}

pub fn map_image_list(doc: &Value) -> Batch<ImageRecord> {
    decode_batch(doc, try_image)
}

pub fn map_image_history(doc: &Value) -> Batch<ImageHistoryEntry> {
    decode_batch(doc, try_image_history_entry)
}

pub fn map_network_list(doc: &Value) -> Batch<NetworkRecord> {
    decode_batch(doc, try_network)
}

pub fn map_network_created(doc: &Value) -> NetworkCreated {
    let f = Fields::new(doc);
    NetworkCreated {
        id: f.string("Id"),
        warning: f.string("Warning"),
    }
}

/// `[{"Untagged": ...}, {"Deleted": ...}]` from `DELETE /images/{name}`.
pub fn map_image_removed(doc: &Value) -> ImageRemoved {
    let entries = doc.as_array().map(Vec::as_slice).unwrap_or_default();
    let mut removed = ImageRemoved::default();
    for entry in entries.iter().map(Fields::new) {
        if let Some(reference) = entry.opt_string("Untagged") {
            removed.untagged.push(reference);
        }
        if let Some(id) = entry.opt_string("Deleted") {
            removed.deleted.push(id);
        }
    }
    removed
}

/// Names listed by `POST /networks/prune`.
pub fn map_networks_deleted(doc: &Value) -> Vec<String> {
    Fields::new(doc).strings("NetworksDeleted")
}

fn or_zero<T: Default>(entity: &'static str, decoded: Result<T, DecodeError>) -> T {
    decoded.unwrap_or_else(|reason| {
        warn!(entity, %reason, "document not decodable, using the zero value");
        T::default()
    })
}

fn strip_slash(name: &str) -> String {
    name.strip_prefix('/').unwrap_or(name).to_string()
}

/// `Cmd` and `Entrypoint` come as a list, or as a single string from older
/// engines.
fn command_line(f: Fields<'_>, key: &str) -> Vec<String> {
    match f.value(key).and_then(Value::as_str) {
        Some(line) => vec![line.to_string()],
        None => f.strings(key),
    }
}

pub fn try_container(doc: &Value) -> Result<ContainerRecord, DecodeError> {
    let f = Fields::object(doc)?;

    let id = f.strict_str("Id")?.unwrap_or_default().to_string();
    let name = match f.strict_str("Name")? {
        Some(name) => strip_slash(name),
        None => f.strict_strings("Names")?.first().map(|n| strip_slash(n)).unwrap_or_default(),
    };
    let state = f
        .strict_object("State")?
        .map(container_state)
        .unwrap_or_default();

    Ok(ContainerRecord {
        id,
        name,
        created: f.string("Created"),
        path: f.string("Path"),
        args: f.strings("Args"),
        image: f.string("Image"),
        state,
        config: f.nested("Config", container_config),
        host_config: f.nested("HostConfig", host_config),
        network_settings: f.nested("NetworkSettings", network_settings),
        mounts: f.array("Mounts", each_object(mount)),
        graph_driver: f.nested("GraphDriver", graph_driver),
        image_manifest_descriptor: f.nested("ImageManifestDescriptor", image_manifest_descriptor),
        restart_count: f.int("RestartCount"),
        driver: f.string("Driver"),
        platform: f.string("Platform"),
        log_path: f.string("LogPath"),
        hostname_path: f.string("HostnamePath"),
        hosts_path: f.string("HostsPath"),
        resolv_conf_path: f.string("ResolvConfPath"),
        mount_label: f.string("MountLabel"),
        process_label: f.string("ProcessLabel"),
        app_armor_profile: f.string("AppArmorProfile"),
        exec_ids: f.strings("ExecIDs"),
    })
}

fn container_state(f: Fields<'_>) -> ContainerState {
    ContainerState {
        status: ContainerStatus::from(f.string_or("Status", "unknown").as_str()),
        running: f.bool("Running"),
        paused: f.bool("Paused"),
        restarting: f.bool("Restarting"),
        oom_killed: f.bool("OOMKilled"),
        dead: f.bool("Dead"),
        pid: f.int("Pid"),
        exit_code: f.int("ExitCode"),
        error: f.string("Error"),
        started_at: f.string("StartedAt"),
        finished_at: f.string("FinishedAt"),
    }
}

fn container_config(f: Fields<'_>) -> ContainerConfig {
    ContainerConfig {
        hostname: f.string("Hostname"),
        domainname: f.string("Domainname"),
        user: f.string("User"),
        attach_stdin: f.bool("AttachStdin"),
        attach_stdout: f.bool("AttachStdout"),
        attach_stderr: f.bool("AttachStderr"),
        tty: f.bool("Tty"),
        open_stdin: f.bool("OpenStdin"),
        stdin_once: f.bool("StdinOnce"),
        env: f.strings("Env"),
        cmd: command_line(f, "Cmd"),
        entrypoint: command_line(f, "Entrypoint"),
        image: f.string("Image"),
        labels: f.string_map("Labels"),
        working_dir: f.string("WorkingDir"),
        on_build: f.strings("OnBuild"),
        exposed_ports: f.keys("ExposedPorts"),
        volumes: f.keys("Volumes"),
    }
}

fn host_config(f: Fields<'_>) -> HostConfig {
    HostConfig {
        cpu_shares: f.int("CpuShares"),
        cpu_quota: f.int("CpuQuota"),
        cpu_period: f.int("CpuPeriod"),
        cpu_realtime_period: f.int("CpuRealtimePeriod"),
        cpu_realtime_runtime: f.int("CpuRealtimeRuntime"),
        cpu_count: f.int("CpuCount"),
        cpu_percent: f.int("CpuPercent"),
        nano_cpus: f.int("NanoCpus"),
        cpuset_cpus: f.string("CpusetCpus"),
        cpuset_mems: f.string("CpusetMems"),
        memory: f.int("Memory"),
        memory_reservation: f.int("MemoryReservation"),
        memory_swap: f.int("MemorySwap"),
        memory_swappiness: f.opt_int("MemorySwappiness"),
        oom_kill_disable: f.opt_bool("OomKillDisable"),
        oom_score_adj: f.int("OomScoreAdj"),
        pids_limit: f.opt_int("PidsLimit"),
        blkio_weight: f.int("BlkioWeight"),
        io_maximum_bandwidth: f.int("IOMaximumBandwidth"),
        io_maximum_iops: f.int("IOMaximumIOps"),
        devices: f.array("Devices", each_object(device_mapping)),
        cap_add: f.strings("CapAdd"),
        cap_drop: f.strings("CapDrop"),
        restart_policy: f.nested("RestartPolicy", |p| RestartPolicy {
            name: p.string("Name"),
            maximum_retry_count: p.int("MaximumRetryCount"),
        }),
        port_bindings: f.object_map("PortBindings", |v| Some(port_bindings(v))),
        binds: f.strings("Binds"),
        dns: f.strings("Dns"),
        dns_options: f.strings("DnsOptions"),
        dns_search: f.strings("DnsSearch"),
        extra_hosts: f.strings("ExtraHosts"),
        group_add: f.strings("GroupAdd"),
        links: f.strings("Links"),
        masked_paths: f.strings("MaskedPaths"),
        readonly_paths: f.strings("ReadonlyPaths"),
        log_config: f.nested("LogConfig", |l| LogConfig {
            log_type: l.string("Type"),
            config: l.string_map("Config"),
        }),
        security_opt: f.strings("SecurityOpt"),
        ulimits: f.array(
            "Ulimits",
            each_object(|u| Ulimit {
                name: u.string("Name"),
                soft: u.int("Soft"),
                hard: u.int("Hard"),
            }),
        ),
        network_mode: f.string("NetworkMode"),
        ipc_mode: f.string("IpcMode"),
        pid_mode: f.string("PidMode"),
        uts_mode: f.string("UTSMode"),
        userns_mode: f.string("UsernsMode"),
        cgroupns_mode: f.string("CgroupnsMode"),
        cgroup: f.string("Cgroup"),
        cgroup_parent: f.string("CgroupParent"),
        isolation: f.string("Isolation"),
        runtime: f.string("Runtime"),
        shm_size: f.int("ShmSize"),
        volume_driver: f.string("VolumeDriver"),
        volumes_from: f.strings("VolumesFrom"),
        container_id_file: f.string("ContainerIDFile"),
        auto_remove: f.bool("AutoRemove"),
        privileged: f.bool("Privileged"),
        publish_all_ports: f.bool("PublishAllPorts"),
        readonly_rootfs: f.bool("ReadonlyRootfs"),
    }
}

fn device_mapping(f: Fields<'_>) -> DeviceMapping {
    DeviceMapping {
        path_on_host: f.string("PathOnHost"),
        path_in_container: f.string("PathInContainer"),
        cgroup_permissions: f.string("CgroupPermissions"),
    }
}

// `"80/tcp": null` means the port is exposed but not published.
fn port_bindings(node: &Value) -> Vec<PortBinding> {
    node.as_array()
        .map(|bindings| {
            bindings
                .iter()
                .filter_map(each_object(|b| PortBinding {
                    host_ip: b.string("HostIp"),
                    host_port: b.string("HostPort"),
                }))
                .collect()
        })
        .unwrap_or_default()
}

fn network_settings(f: Fields<'_>) -> NetworkSettings {
    NetworkSettings {
        bridge: f.string("Bridge"),
        sandbox_id: f.string("SandboxID"),
        sandbox_key: f.string("SandboxKey"),
        hairpin_mode: f.bool("HairpinMode"),
        link_local_ipv6_address: f.string("LinkLocalIPv6Address"),
        link_local_ipv6_prefix_len: f.int("LinkLocalIPv6PrefixLen"),
        endpoint_id: f.string("EndpointID"),
        gateway: f.string("Gateway"),
        ip_address: f.string("IPAddress"),
        ip_prefix_len: f.int("IPPrefixLen"),
        ipv6_gateway: f.string("IPv6Gateway"),
        global_ipv6_address: f.string("GlobalIPv6Address"),
        global_ipv6_prefix_len: f.int("GlobalIPv6PrefixLen"),
        mac_address: f.string("MacAddress"),
        secondary_ip_addresses: f.array("SecondaryIPAddresses", secondary_address),
        secondary_ipv6_addresses: f.array("SecondaryIPv6Addresses", secondary_address),
        ports: f.object_map("Ports", |v| Some(port_bindings(v))),
        networks: f.object_map("Networks", each_object(endpoint_settings)),
    }
}

// Plain strings in old engines, `{"Addr": ..., "PrefixLen": ...}` in current ones.
fn secondary_address(node: &Value) -> Option<String> {
    node.as_str()
        .map(str::to_owned)
        .or_else(|| Fields::new(node).opt_string("Addr"))
}

fn endpoint_settings(f: Fields<'_>) -> EndpointSettings {
    EndpointSettings {
        network_id: f.string("NetworkID"),
        endpoint_id: f.string("EndpointID"),
        gateway: f.string("Gateway"),
        ip_address: f.string("IPAddress"),
        ip_prefix_len: f.int("IPPrefixLen"),
        ipv6_gateway: f.string("IPv6Gateway"),
        global_ipv6_address: f.string("GlobalIPv6Address"),
        global_ipv6_prefix_len: f.int("GlobalIPv6PrefixLen"),
        mac_address: f.string("MacAddress"),
        gw_priority: f.int("GwPriority"),
        aliases: f.strings("Aliases"),
        links: f.strings("Links"),
        dns_names: f.strings("DNSNames"),
        driver_opts: f.string_map("DriverOpts"),
    }
}

fn mount(f: Fields<'_>) -> Mount {
    Mount {
        mount_type: f.string("Type"),
        name: f.string("Name"),
        source: f.string("Source"),
        destination: f.string("Destination"),
        driver: f.string("Driver"),
        mode: f.string("Mode"),
        rw: f.bool("RW"),
        propagation: f.string("Propagation"),
    }
}

fn graph_driver(f: Fields<'_>) -> GraphDriver {
    GraphDriver {
        name: f.string("Name"),
        data: f.string_map("Data"),
    }
}

// OCI descriptor, lower-camel keys.
fn image_manifest_descriptor(f: Fields<'_>) -> ImageManifestDescriptor {
    let (architecture, os) = f.nested("platform", |p| (p.string("architecture"), p.string("os")));
    ImageManifestDescriptor {
        media_type: f.string("mediaType"),
        digest: f.string("digest"),
        size: f.int("size"),
        architecture,
        os,
    }
}

pub fn try_container_summary(doc: &Value) -> Result<ContainerSummary, DecodeError> {
    let f = Fields::object(doc)?;

    let id = f.strict_str("Id")?.unwrap_or_default().to_string();
    let names = f.strict_strings("Names")?;
    let state = ContainerStatus::from(f.strict_str("State")?.unwrap_or_default());
    let created = f.strict_int("Created")?.unwrap_or_default();

    let mut networks: HashMap<String, EndpointSettings> = f.nested("NetworkSettings", |ns| {
        ns.object_map("Networks", each_object(endpoint_settings))
    });
    if networks.is_empty() {
        networks = f.object_map("Networks", each_object(endpoint_settings));
    }

    Ok(ContainerSummary {
        id,
        name: names.first().map(|n| strip_slash(n)).unwrap_or_default(),
        names,
        image: f.string("Image"),
        image_id: f.string("ImageID"),
        command: f.string("Command"),
        state,
        status: f.string("Status"),
        created,
        labels: f.string_map("Labels"),
        ports: f.array(
            "Ports",
            each_object(|p| Port {
                ip: p.string("IP"),
                private_port: p.int("PrivatePort"),
                public_port: p.int("PublicPort"),
                port_type: p.string("Type"),
            }),
        ),
        networks,
        mounts: f.array("Mounts", each_object(mount)),
    })
}

pub fn try_image(doc: &Value) -> Result<ImageRecord, DecodeError> {
    let f = Fields::object(doc)?;
    let id = f.strict_str("Id")?.unwrap_or_default().to_string();

    Ok(ImageRecord {
        id,
        // `ParentId` in list views, `Parent` in inspect.
        parent_id: f
            .opt_string("ParentId")
            .unwrap_or_else(|| f.string("Parent")),
        repo_tags: f.strings("RepoTags"),
        repo_digests: f.strings("RepoDigests"),
        // Unix seconds in list views; inspect sends RFC 3339 and keeps the default.
        created: f.int("Created"),
        size: f.int("Size"),
        shared_size: f.int("SharedSize"),
        virtual_size: f.int("VirtualSize"),
        labels: f.string_map("Labels"),
        containers: f.int("Containers"),
    })
}

pub fn try_image_history_entry(doc: &Value) -> Result<ImageHistoryEntry, DecodeError> {
    let f = Fields::object(doc)?;
    let id = f.strict_str("Id")?.unwrap_or_default().to_string();

    Ok(ImageHistoryEntry {
        id,
        created: f.int("Created"),
        created_by: f.string("CreatedBy"),
        tags: f.strings("Tags"),
        size: f.int("Size"),
        comment: f.string("Comment"),
    })
}

pub fn try_network(doc: &Value) -> Result<NetworkRecord, DecodeError> {
    let f = Fields::object(doc)?;
    let name = f.strict_str("Name")?.unwrap_or_default().to_string();
    let id = f.strict_str("Id")?.unwrap_or_default().to_string();

    let spec = NetworkSpec {
        name,
        id,
        driver: f.string("Driver"),
        scope: f.string("Scope"),
        enable_ipv4: f.bool_or("EnableIPv4", true),
        enable_ipv6: f.bool("EnableIPv6"),
        ipam: f.nested("IPAM", |i| ipam(i, &IpamKeys::ENGINE)),
        internal: f.bool("Internal"),
        attachable: f.bool("Attachable"),
        ingress: f.bool("Ingress"),
        config_from: f.nested("ConfigFrom", |c| c.string("Network")),
        config_only: f.bool("ConfigOnly"),
    };

    Ok(NetworkRecord {
        spec,
        created: f.string("Created"),
        containers: f.object_map(
            "Containers",
            each_object(|c| NetworkContainer {
                name: c.string("Name"),
                endpoint_id: c.string("EndpointID"),
                mac_address: c.string("MacAddress"),
                ipv4_address: c.string("IPv4Address"),
                ipv6_address: c.string("IPv6Address"),
            }),
        ),
        labels: f.string_map("Labels"),
        options: f.string_map("Options"),
        peers: f.array(
            "Peers",
            each_object(|p| Peer {
                name: p.string("Name"),
                ip: p.string("IP"),
            }),
        ),
    })
}

/// Key names of an IPAM block. The engine and compose files spell them
/// differently but share the structure.
pub(crate) struct IpamKeys {
    driver: &'static str,
    config: &'static str,
    options: &'static str,
    subnet: &'static str,
    ip_range: &'static str,
    gateway: &'static str,
    aux_addresses: &'static str,
}

impl IpamKeys {
    pub(crate) const ENGINE: IpamKeys = IpamKeys {
        driver: "Driver",
        config: "Config",
        options: "Options",
        subnet: "Subnet",
        ip_range: "IPRange",
        gateway: "Gateway",
        aux_addresses: "AuxiliaryAddresses",
    };

    pub(crate) const COMPOSE: IpamKeys = IpamKeys {
        driver: "driver",
        config: "config",
        options: "options",
        subnet: "subnet",
        ip_range: "ip_range",
        gateway: "gateway",
        aux_addresses: "aux_addresses",
    };
}

/// IPAM block. `config` may be a single mapping or a sequence of them; both
/// go through the same per-entry extraction.
pub(crate) fn ipam<N: Node>(f: Fields<'_, N>, keys: &IpamKeys) -> Ipam {
    Ipam {
        driver: f.string_or(keys.driver, "default"),
        config: f.one_or_many(
            keys.config,
            each_object(|c| IpamConfig {
                subnet: c.string(keys.subnet),
                ip_range: c.string(keys.ip_range),
                gateway: c.string(keys.gateway),
                aux_addresses: c.string_map(keys.aux_addresses),
            }),
        ),
        options: f.string_map(keys.options),
    }
}
