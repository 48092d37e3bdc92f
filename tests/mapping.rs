use dockhand::decode::DecodeError;
use dockhand::mapper::{
    map_container, map_container_list, map_container_summary, map_image, map_image_list,
    map_network, map_network_list, try_container_summary,
};
use dockhand::types::{
    ContainerRecord, ContainerStatus, ContainerSummary, ImageRecord, NetworkRecord, PortBinding,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn inspect_doc() -> serde_json::Value {
    json!({
        "Id": "4fa6e0f0c678",
        "Created": "2024-05-01T10:00:00.000000000Z",
        "Path": "nginx",
        "Args": ["-g", "daemon off;"],
        "State": {
            "Status": "running",
            "Running": true,
            "Paused": false,
            "Restarting": false,
            "OOMKilled": false,
            "Dead": false,
            "Pid": 1234,
            "ExitCode": 0,
            "Error": "",
            "StartedAt": "2024-05-01T10:00:01Z",
            "FinishedAt": "0001-01-01T00:00:00Z"
        },
        "Image": "sha256:abc",
        "Name": "/web",
        "RestartCount": 2,
        "Driver": "overlay2",
        "Platform": "linux",
        "Config": {
            "Hostname": "4fa6e0f0c678",
            "Env": ["PATH=/usr/bin", "MODE=prod"],
            "Cmd": ["nginx", "-g", "daemon off;"],
            "Entrypoint": "/docker-entrypoint.sh",
            "Image": "nginx:1.25",
            "Labels": {"com.example.tier": "front"},
            "ExposedPorts": {"80/tcp": {}},
            "Tty": false
        },
        "HostConfig": {
            "CpuShares": 512,
            "Memory": 268435456,
            "MemorySwappiness": null,
            "OomKillDisable": false,
            "PidsLimit": 100,
            "CapAdd": ["NET_ADMIN"],
            "CapDrop": null,
            "RestartPolicy": {"Name": "on-failure", "MaximumRetryCount": 3},
            "PortBindings": {
                "80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}],
                "443/tcp": null
            },
            "Devices": [{"PathOnHost": "/dev/fuse", "PathInContainer": "/dev/fuse", "CgroupPermissions": "rwm"}],
            "LogConfig": {"Type": "json-file", "Config": {"max-size": "10m"}},
            "NetworkMode": "bridge"
        },
        "NetworkSettings": {
            "SandboxKey": "/var/run/docker/netns/abc",
            "Ports": {"80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8080"}]},
            "Networks": {
                "bridge": {
                    "NetworkID": "n1",
                    "IPAddress": "172.17.0.2",
                    "IPPrefixLen": 16,
                    "Gateway": "172.17.0.1",
                    "MacAddress": "02:42:ac:11:00:02",
                    "Aliases": null
                }
            }
        },
        "Mounts": [
            {"Type": "bind", "Source": "/srv/www", "Destination": "/usr/share/nginx/html", "Mode": "ro", "RW": false, "Propagation": "rprivate"}
        ],
        "GraphDriver": {"Name": "overlay2", "Data": {"MergedDir": "/var/lib/docker/overlay2/x/merged"}}
    })
}

#[test]
fn test_map_container_inspect() {
    let container = map_container(&inspect_doc());

    assert_eq!(container.id, "4fa6e0f0c678");
    assert_eq!(container.name, "web");
    assert_eq!(container.args, vec!["-g", "daemon off;"]);
    assert_eq!(container.restart_count, 2);

    assert_eq!(container.state.status, ContainerStatus::Running);
    assert!(container.state.running);
    assert_eq!(container.state.pid, 1234);

    assert_eq!(container.config.cmd, vec!["nginx", "-g", "daemon off;"]);
    assert_eq!(container.config.entrypoint, vec!["/docker-entrypoint.sh"]);
    assert_eq!(container.config.labels["com.example.tier"], "front");
    assert_eq!(container.config.exposed_ports, vec!["80/tcp"]);

    let host = &container.host_config;
    assert_eq!(host.cpu_shares, 512);
    assert_eq!(host.memory, 268435456);
    assert_eq!(host.memory_swappiness, None);
    assert_eq!(host.oom_kill_disable, Some(false));
    assert_eq!(host.pids_limit, Some(100));
    assert_eq!(host.cap_add, vec!["NET_ADMIN"]);
    assert!(host.cap_drop.is_empty());
    assert_eq!(host.restart_policy.name, "on-failure");
    assert_eq!(host.restart_policy.maximum_retry_count, 3);
    assert_eq!(
        host.port_bindings["80/tcp"],
        vec![PortBinding {
            host_ip: "0.0.0.0".to_string(),
            host_port: "8080".to_string()
        }]
    );
    assert!(host.port_bindings["443/tcp"].is_empty());
    assert_eq!(host.devices[0].cgroup_permissions, "rwm");
    assert_eq!(host.log_config.config["max-size"], "10m");

    let bridge = &container.network_settings.networks["bridge"];
    assert_eq!(bridge.ip_address, "172.17.0.2");
    assert_eq!(bridge.ip_prefix_len, 16);
    assert!(bridge.aliases.is_empty());

    assert_eq!(container.mounts.len(), 1);
    assert!(!container.mounts[0].rw);
    assert_eq!(container.graph_driver.data["MergedDir"], "/var/lib/docker/overlay2/x/merged");
}

#[test]
fn test_missing_fields_take_documented_defaults() {
    let container = map_container(&json!({"Id": "abc"}));
    assert_eq!(container.id, "abc");
    assert_eq!(container.restart_count, 0);
    assert!(container.config.labels.is_empty());
    assert_eq!(container.state.status, ContainerStatus::Unknown);
    assert_eq!(container.host_config.pids_limit, None);
    assert!(container.network_settings.networks.is_empty());
}

#[test]
fn test_mistyped_leaf_only_affects_that_field() {
    let container = map_container(&json!({
        "Id": "abc",
        "RestartCount": "two",
        "Config": {"Env": "MODE=prod", "Hostname": "web"},
        "HostConfig": {"Memory": "lots", "CpuShares": 256}
    }));
    assert_eq!(container.restart_count, 0);
    assert!(container.config.env.is_empty());
    assert_eq!(container.config.hostname, "web");
    assert_eq!(container.host_config.memory, 0);
    assert_eq!(container.host_config.cpu_shares, 256);
}

#[test]
fn test_root_scalar_decodes_to_zero_value() {
    assert_eq!(map_container(&json!("oops")), ContainerRecord::default());
    assert_eq!(map_container_summary(&json!(12)), ContainerSummary::default());
    assert_eq!(map_image(&json!(null)), ImageRecord::default());
    assert_eq!(map_network(&json!([1, 2])), NetworkRecord::default());
}

#[test]
fn test_identity_type_mismatch_yields_zero_value_for_single_items() {
    assert_eq!(
        map_container(&json!({"Id": 42, "Name": "/web"})),
        ContainerRecord::default()
    );
    assert_eq!(
        map_container(&json!({"Id": "abc", "State": "running"})),
        ContainerRecord::default()
    );
}

#[test]
fn test_status_strings() {
    for status in ["created", "running", "paused", "restarting", "exited", "removing", "dead"] {
        assert_eq!(ContainerStatus::from(status).as_str(), status);
    }
    for status in ["", "Running", "zombie", "up"] {
        assert_eq!(ContainerStatus::from(status), ContainerStatus::Unknown);
    }
    assert_eq!(ContainerStatus::Unknown.as_str(), "unknown");
}

#[test]
fn test_map_container_summary() {
    let summary = map_container_summary(&json!({
        "Id": "abc",
        "Names": ["/web", "/alias"],
        "Image": "nginx",
        "ImageID": "sha256:def",
        "Command": "nginx -g 'daemon off;'",
        "Created": 1700000000,
        "State": "exited",
        "Status": "Exited (0) 2 hours ago",
        "Ports": [{"IP": "0.0.0.0", "PrivatePort": 80, "PublicPort": 8080, "Type": "tcp"}, {"PrivatePort": 443, "Type": "tcp"}],
        "Labels": {"tier": "front"},
        "NetworkSettings": {"Networks": {"bridge": {"IPAddress": "172.17.0.2", "Gateway": "172.17.0.1", "MacAddress": "02:42"}}},
        "Mounts": [{"Source": "/data", "Destination": "/var/lib/data", "Type": "volume", "RW": true}]
    }));

    assert_eq!(summary.name, "web");
    assert_eq!(summary.names.len(), 2);
    assert_eq!(summary.state, ContainerStatus::Exited);
    assert_eq!(summary.created, 1700000000);
    assert_eq!(summary.ports[0].public_port, 8080);
    assert_eq!(summary.ports[1].public_port, 0);
    assert_eq!(summary.ports[1].ip, "");
    assert_eq!(summary.networks["bridge"].gateway, "172.17.0.1");
    assert!(summary.mounts[0].rw);
}

#[test]
fn test_summary_networks_fall_back_to_top_level() {
    let summary = map_container_summary(&json!({
        "Id": "abc",
        "Networks": {"backend": {"IPAddress": "10.0.0.5"}}
    }));
    assert_eq!(summary.networks["backend"].ip_address, "10.0.0.5");
}

#[test]
fn test_batch_isolates_the_bad_element() {
    let batch = map_container_list(&json!([
        {"Id": "a", "Names": ["/one"], "State": "running", "Created": 1},
        {"Id": "b", "Names": ["/two"], "State": "running", "Created": "yesterday"},
        {"Id": "c", "Names": ["/three"], "State": "running", "Created": 3}
    ]));

    assert_eq!(
        batch.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "c"]
    );
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].index, 1);
    assert_eq!(
        batch.skipped[0].reason,
        DecodeError::WrongType {
            field: "Created".to_string(),
            expected: "integer",
            found: "string",
        }
    );
}

#[test]
fn test_try_summary_rejects_non_object() {
    assert_eq!(
        try_container_summary(&json!("x")),
        Err(DecodeError::NotAnObject { found: "string" })
    );
}

#[test]
fn test_list_of_non_array_is_empty() {
    assert!(map_container_list(&json!({"message": "boom"})).is_empty());
    assert!(map_image_list(&json!("text")).is_empty());
    assert!(map_network_list(&json!(null)).is_empty());
}

#[test]
fn test_map_image_list() {
    let batch = map_image_list(&json!([
        {
            "Id": "sha256:abc",
            "ParentId": "sha256:parent",
            "RepoTags": ["alpine:3.19", "alpine:latest"],
            "RepoDigests": ["alpine@sha256:d"],
            "Created": 1700000000,
            "Size": 7340032,
            "SharedSize": -1,
            "VirtualSize": 7340032,
            "Labels": null,
            "Containers": 2
        },
        {"Id": ["not", "a", "string"]},
        "garbage"
    ]));

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.skipped.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2]);
    let image = &batch.items[0];
    assert_eq!(image.parent_id, "sha256:parent");
    assert_eq!(image.repo_tags, vec!["alpine:3.19", "alpine:latest"]);
    assert_eq!(image.shared_size, -1);
    assert!(image.labels.is_empty());
    assert_eq!(image.containers, 2);
}

#[test]
fn test_image_inspect_parent_key() {
    let image = map_image(&json!({"Id": "sha256:abc", "Parent": "sha256:p", "Created": "2024-01-01T00:00:00Z"}));
    assert_eq!(image.parent_id, "sha256:p");
    assert_eq!(image.created, 0);
}

#[test]
fn test_map_network() {
    let network = map_network(&json!({
        "Name": "backend",
        "Id": "7d86d31b",
        "Created": "2024-05-01T10:00:00Z",
        "Scope": "local",
        "Driver": "bridge",
        "EnableIPv6": false,
        "IPAM": {
            "Driver": "default",
            "Options": null,
            "Config": [
                {"Subnet": "172.28.0.0/16", "IPRange": "172.28.5.0/24", "Gateway": "172.28.0.1", "AuxiliaryAddresses": {"host1": "172.28.1.5"}},
                {"Subnet": "fd00::/64"}
            ]
        },
        "Internal": true,
        "Attachable": false,
        "Ingress": false,
        "ConfigFrom": {"Network": ""},
        "ConfigOnly": false,
        "Containers": {
            "4fa6": {"Name": "web", "EndpointID": "e1", "MacAddress": "02:42", "IPv4Address": "172.28.0.2/16", "IPv6Address": ""}
        },
        "Options": {"com.docker.network.bridge.name": "br-backend"},
        "Labels": {"project": "shop"}
    }));

    assert_eq!(network.name(), "backend");
    assert_eq!(network.id(), "7d86d31b");
    assert!(network.spec.internal);
    assert!(network.spec.enable_ipv4);
    assert_eq!(network.spec.ipam.config.len(), 2);
    assert_eq!(network.spec.ipam.config[0].ip_range, "172.28.5.0/24");
    assert_eq!(network.spec.ipam.config[0].aux_addresses["host1"], "172.28.1.5");
    assert_eq!(network.spec.ipam.config[1].gateway, "");
    assert_eq!(network.containers["4fa6"].ipv4_address, "172.28.0.2/16");
    assert_eq!(network.options["com.docker.network.bridge.name"], "br-backend");
    assert_eq!(network.labels["project"], "shop");
}

#[test]
fn test_ipam_config_single_mapping_or_sequence() {
    let single = map_network(&json!({
        "Name": "n", "Id": "1",
        "IPAM": {"Config": {"Subnet": "10.0.0.0/24", "Gateway": "10.0.0.1"}}
    }));
    let sequence = map_network(&json!({
        "Name": "n", "Id": "1",
        "IPAM": {"Config": [{"Subnet": "10.0.0.0/24", "Gateway": "10.0.0.1"}]}
    }));
    assert_eq!(single.spec.ipam.config.len(), 1);
    assert_eq!(single.spec.ipam, sequence.spec.ipam);
    assert_eq!(single.spec.ipam.driver, "default");
}

#[test]
fn test_network_list_skips_mistyped_identity() {
    let batch = map_network_list(&json!([
        {"Name": "bridge", "Id": "1"},
        {"Name": 5, "Id": "2"},
        {"Name": "host", "Id": "3"}
    ]));
    assert_eq!(
        batch.iter().map(|n| n.name()).collect::<Vec<_>>(),
        vec!["bridge", "host"]
    );
}
