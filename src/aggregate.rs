use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    Secret, Service,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use tracing::debug;

use crate::model::{
    ClusterSummary, ContainerView, DeploymentView, EventView, GenericResourceView, NamespaceScope,
    NodeView, PodView, ResourceUsageSummary, ServiceView,
};
use crate::provider::ClusterProvider;

/// Parses a Kubernetes CPU quantity into millicores. Nanocore and microcore
/// suffixes divide with integer arithmetic, bare values are cores. Blank or
/// unparsable input is zero.
pub fn parse_cpu_millis(value: &str) -> u64 {
    let raw = value.trim();
    if raw.is_empty() || raw == "0" {
        return 0;
    }

    if let Some(number) = raw.strip_suffix('n') {
        return number.parse::<u64>().map(|n| n / 1_000_000).unwrap_or(0);
    }
    if let Some(number) = raw.strip_suffix('u') {
        return number.parse::<u64>().map(|n| n / 1_000).unwrap_or(0);
    }
    if let Some(number) = raw.strip_suffix('m') {
        return number.parse::<u64>().unwrap_or(0);
    }

    raw.parse::<f64>()
        .map(|cores| (cores * 1000.0) as u64)
        .unwrap_or(0)
}

/// Parses a Kubernetes memory quantity into bytes. Binary suffixes are exact
/// powers of 1024 (integer arithmetic, since they feed capacity fractions),
/// decimal suffixes are powers of 1000. Blank or unparsable input is zero.
pub fn parse_memory_bytes(value: &str) -> u64 {
    const BINARY_UNITS: [(&str, u64); 4] = [
        ("Ti", 1 << 40),
        ("Gi", 1 << 30),
        ("Mi", 1 << 20),
        ("Ki", 1 << 10),
    ];
    const DECIMAL_UNITS: [(&str, u64); 3] = [
        ("T", 1_000_000_000_000),
        ("G", 1_000_000_000),
        ("M", 1_000_000),
    ];

    let raw = value.trim();
    if raw.is_empty() || raw == "0" {
        return 0;
    }

    for (suffix, unit) in BINARY_UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number
                .parse::<u64>()
                .map(|n| n.saturating_mul(unit))
                .unwrap_or(0);
        }
    }
    for (suffix, unit) in DECIMAL_UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return number
                .parse::<u64>()
                .map(|n| n.saturating_mul(unit))
                .unwrap_or(0);
        }
    }
    if let Some(number) = raw.strip_suffix('K').or_else(|| raw.strip_suffix('k')) {
        return number.parse::<u64>().map(|n| n * 1_000).unwrap_or(0);
    }

    raw.parse::<u64>()
        .unwrap_or_else(|_| raw.parse::<f64>().map(|bytes| bytes as u64).unwrap_or(0))
}

pub fn format_memory_size(bytes: u64) -> String {
    const TI: u64 = 1 << 40;
    const GI: u64 = 1 << 30;
    const MI: u64 = 1 << 20;
    const KI: u64 = 1 << 10;

    if bytes >= TI {
        format!("{:.1} TiB", bytes as f64 / TI as f64)
    } else if bytes >= GI {
        format!("{:.1} GiB", bytes as f64 / GI as f64)
    } else if bytes >= MI {
        format!("{:.0} MiB", bytes as f64 / MI as f64)
    } else if bytes >= KI {
        format!("{:.0} KiB", bytes as f64 / KI as f64)
    } else {
        format!("{bytes} B")
    }
}

pub fn format_cpu_cores(millis: u64) -> String {
    if millis >= 1000 {
        format!("{:.1} cores", millis as f64 / 1000.0)
    } else {
        format!("{millis}m")
    }
}

/// Coarse age string using the largest applicable unit pair. A missing
/// timestamp yields an empty string; an unparsable one is returned verbatim.
/// Callers rely on those being distinct fallbacks.
pub fn format_age(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = timestamp.filter(|value| !value.trim().is_empty()) else {
        return String::new();
    };
    let Ok(created) = DateTime::parse_from_rfc3339(raw) else {
        return raw.to_string();
    };

    let seconds = now
        .signed_duration_since(created.with_timezone(&Utc))
        .num_seconds()
        .max(0);
    let minutes = seconds / 60;
    let hours = seconds / 3_600;
    let days = seconds / 86_400;

    if days > 365 {
        format!("{}y{}mo", days / 365, (days % 365) / 30)
    } else if days > 30 {
        format!("{}mo{}d", days / 30, days % 30)
    } else if days > 0 {
        format!("{}d{}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h{}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

fn age_of(meta: &ObjectMeta, now: DateTime<Utc>) -> String {
    let rendered = meta
        .creation_timestamp
        .as_ref()
        .map(|time| time.0.to_string());
    format_age(rendered.as_deref(), now)
}

fn uid_of(meta: &ObjectMeta) -> String {
    meta.uid.clone().unwrap_or_default()
}

fn name_of(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn labels_of(meta: &ObjectMeta) -> std::collections::BTreeMap<String, String> {
    meta.labels.clone().unwrap_or_default()
}

/// Display status for a pod: the phase, unless a container exposes a waiting
/// reason (CrashLoopBackOff, ImagePullBackOff, …). A terminated reason only
/// overrides when the pod did not complete successfully. The first container
/// with a reason wins.
pub fn effective_pod_status(pod: &Pod) -> String {
    let Some(phase) = pod.status.as_ref().and_then(|status| status.phase.clone()) else {
        return "Unknown".to_string();
    };

    let statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);
    for container in statuses {
        let Some(state) = container.state.as_ref() else {
            continue;
        };
        if let Some(reason) = state.waiting.as_ref().and_then(|w| w.reason.clone()) {
            return reason;
        }
        if phase != "Succeeded"
            && let Some(reason) = state.terminated.as_ref().and_then(|t| t.reason.clone())
        {
            return reason;
        }
    }

    phase
}

fn container_views(pod: &Pod) -> Vec<ContainerView> {
    let declared = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or(&[]);
    let statuses = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or(&[]);

    declared
        .iter()
        .map(|container| {
            let status = statuses.iter().find(|cs| cs.name == container.name);
            let state = match status.and_then(|cs| cs.state.as_ref()) {
                Some(state) if state.running.is_some() => "Running".to_string(),
                Some(state) if state.waiting.is_some() => state
                    .waiting
                    .as_ref()
                    .and_then(|w| w.reason.clone())
                    .unwrap_or_else(|| "Waiting".to_string()),
                Some(state) if state.terminated.is_some() => state
                    .terminated
                    .as_ref()
                    .and_then(|t| t.reason.clone())
                    .unwrap_or_else(|| "Terminated".to_string()),
                _ => "Unknown".to_string(),
            };

            ContainerView {
                name: container.name.clone(),
                image: container.image.clone().unwrap_or_default(),
                ready: status.map(|cs| cs.ready).unwrap_or(false),
                restarts: status.map(|cs| cs.restart_count.max(0) as u32).unwrap_or(0),
                state,
            }
        })
        .collect()
}

pub fn pod_view(pod: &Pod, now: DateTime<Utc>) -> PodView {
    let containers = container_views(pod);
    let ready = containers.iter().filter(|c| c.ready).count();
    let restarts = containers.iter().map(|c| c.restarts).sum();

    PodView {
        uid: uid_of(&pod.metadata),
        name: name_of(&pod.metadata),
        namespace: pod.metadata.namespace.clone().unwrap_or_default(),
        status: effective_pod_status(pod),
        ready: format!("{ready}/{}", containers.len()),
        restarts,
        age: age_of(&pod.metadata, now),
        node: pod
            .spec
            .as_ref()
            .and_then(|spec| spec.node_name.clone())
            .unwrap_or_else(|| "<none>".to_string()),
        ip: pod
            .status
            .as_ref()
            .and_then(|status| status.pod_ip.clone())
            .unwrap_or_else(|| "<none>".to_string()),
        labels: labels_of(&pod.metadata),
        containers,
    }
}

pub fn pod_views(pods: &[Pod], now: DateTime<Utc>) -> Vec<PodView> {
    pods.iter().map(|pod| pod_view(pod, now)).collect()
}

pub fn deployment_view(deployment: &Deployment, now: DateTime<Utc>) -> DeploymentView {
    let ready = deployment
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0);

    DeploymentView {
        uid: uid_of(&deployment.metadata),
        name: name_of(&deployment.metadata),
        namespace: deployment.metadata.namespace.clone().unwrap_or_default(),
        ready: format!("{ready}/{desired}"),
        up_to_date: deployment
            .status
            .as_ref()
            .and_then(|status| status.updated_replicas)
            .unwrap_or(0)
            .max(0) as u32,
        available: deployment
            .status
            .as_ref()
            .and_then(|status| status.available_replicas)
            .unwrap_or(0)
            .max(0) as u32,
        age: age_of(&deployment.metadata, now),
        strategy: deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.strategy.as_ref())
            .and_then(|strategy| strategy.type_.clone())
            .unwrap_or_default(),
        labels: labels_of(&deployment.metadata),
        conditions: deployment
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|condition| format!("{}={}", condition.type_, condition.status))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

pub fn deployment_views(deployments: &[Deployment], now: DateTime<Utc>) -> Vec<DeploymentView> {
    deployments
        .iter()
        .map(|deployment| deployment_view(deployment, now))
        .collect()
}

pub fn service_view(service: &Service, now: DateTime<Utc>) -> ServiceView {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|port| {
                    let node_port = port
                        .node_port
                        .filter(|np| *np > 0)
                        .map(|np| format!(":{np}"))
                        .unwrap_or_default();
                    let protocol = port.protocol.clone().unwrap_or_else(|| "TCP".to_string());
                    format!("{}{node_port}/{protocol}", port.port)
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    ServiceView {
        uid: uid_of(&service.metadata),
        name: name_of(&service.metadata),
        namespace: service.metadata.namespace.clone().unwrap_or_default(),
        service_type: service
            .spec
            .as_ref()
            .and_then(|spec| spec.type_.clone())
            .unwrap_or_default(),
        cluster_ip: service
            .spec
            .as_ref()
            .and_then(|spec| spec.cluster_ip.clone())
            .unwrap_or_default(),
        ports,
        age: age_of(&service.metadata, now),
        selector: service
            .spec
            .as_ref()
            .and_then(|spec| spec.selector.clone())
            .unwrap_or_default(),
        labels: labels_of(&service.metadata),
    }
}

pub fn service_views(services: &[Service], now: DateTime<Utc>) -> Vec<ServiceView> {
    services
        .iter()
        .map(|service| service_view(service, now))
        .collect()
}

pub fn node_view(node: &Node, now: DateTime<Utc>) -> NodeView {
    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| condition.status == "True")
        .unwrap_or(false);

    let labels = labels_of(&node.metadata);
    let roles = labels
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(str::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let roles = if roles.is_empty() {
        "<none>".to_string()
    } else {
        roles
    };

    let allocatable = node
        .status
        .as_ref()
        .and_then(|status| status.allocatable.as_ref());
    let quantity =
        |key: &str| allocatable.and_then(|alloc| alloc.get(key)).map(|q| q.0.clone());
    let node_info = node.status.as_ref().and_then(|status| status.node_info.as_ref());

    NodeView {
        uid: uid_of(&node.metadata),
        name: name_of(&node.metadata),
        status: if ready { "Ready" } else { "NotReady" }.to_string(),
        roles,
        version: node_info.map(|info| info.kubelet_version.clone()).unwrap_or_default(),
        os: node_info.map(|info| info.os_image.clone()).unwrap_or_default(),
        arch: node_info.map(|info| info.architecture.clone()).unwrap_or_default(),
        container_runtime: node_info
            .map(|info| info.container_runtime_version.clone())
            .unwrap_or_default(),
        cpu: quantity("cpu").unwrap_or_default(),
        memory: quantity("memory").unwrap_or_default(),
        pods: quantity("pods").unwrap_or_default(),
        age: age_of(&node.metadata, now),
        labels,
    }
}

pub fn node_views(nodes: &[Node], now: DateTime<Utc>) -> Vec<NodeView> {
    nodes.iter().map(|node| node_view(node, now)).collect()
}

pub fn event_view(event: &Event, now: DateTime<Utc>) -> EventView {
    let involved = &event.involved_object;
    let creation = event
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|time| time.0.to_string());
    let first = event
        .first_timestamp
        .as_ref()
        .map(|time| time.0.to_string())
        .or_else(|| creation.clone());
    let last = event
        .last_timestamp
        .as_ref()
        .map(|time| time.0.to_string())
        .or(creation);

    EventView {
        uid: uid_of(&event.metadata),
        event_type: event.type_.clone().unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.clone().unwrap_or_default(),
        object_ref: format!(
            "{}/{}",
            involved.kind.clone().unwrap_or_default(),
            involved.name.clone().unwrap_or_default()
        ),
        message: event.message.clone().unwrap_or_default(),
        count: event.count.unwrap_or(1),
        first_seen: format_age(first.as_deref(), now),
        last_seen: format_age(last.as_deref(), now),
        namespace: event.metadata.namespace.clone().unwrap_or_default(),
    }
}

/// Newest first, by creation timestamp.
pub fn event_views(events: &[Event], now: DateTime<Utc>) -> Vec<EventView> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by_key(|event| {
        std::cmp::Reverse(
            event
                .metadata
                .creation_timestamp
                .as_ref()
                .map(|time| time.0.as_second())
                .unwrap_or(0),
        )
    });
    ordered.into_iter().map(|event| event_view(event, now)).collect()
}

fn generic(
    meta: &ObjectMeta,
    status: Option<String>,
    extra_columns: Vec<(String, String)>,
    now: DateTime<Utc>,
) -> GenericResourceView {
    GenericResourceView {
        uid: uid_of(meta),
        name: name_of(meta),
        namespace: meta.namespace.clone(),
        status,
        age: age_of(meta, now),
        labels: labels_of(meta),
        extra_columns,
    }
}

fn column(header: &str, value: impl Into<String>) -> (String, String) {
    (header.to_string(), value.into())
}

pub fn namespace_view(namespace: &Namespace, now: DateTime<Utc>) -> GenericResourceView {
    let phase = namespace
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Active".to_string());
    generic(&namespace.metadata, Some(phase), Vec::new(), now)
}

pub fn config_map_view(config_map: &ConfigMap, now: DateTime<Utc>) -> GenericResourceView {
    let data = config_map.data.as_ref().map(|d| d.len()).unwrap_or(0)
        + config_map.binary_data.as_ref().map(|d| d.len()).unwrap_or(0);
    generic(
        &config_map.metadata,
        None,
        vec![column("Data", data.to_string())],
        now,
    )
}

pub fn secret_view(secret: &Secret, now: DateTime<Utc>) -> GenericResourceView {
    generic(
        &secret.metadata,
        None,
        vec![
            column("Type", secret.type_.clone().unwrap_or_default()),
            column(
                "Data",
                secret
                    .data
                    .as_ref()
                    .map(|d| d.len())
                    .unwrap_or(0)
                    .to_string(),
            ),
        ],
        now,
    )
}

pub fn stateful_set_view(stateful_set: &StatefulSet, now: DateTime<Utc>) -> GenericResourceView {
    let ready = stateful_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    let desired = stateful_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0);
    generic(
        &stateful_set.metadata,
        Some(format!("{ready}/{desired}")),
        vec![column("Ready", format!("{ready}/{desired}"))],
        now,
    )
}

pub fn daemon_set_view(daemon_set: &DaemonSet, now: DateTime<Utc>) -> GenericResourceView {
    let desired = daemon_set
        .status
        .as_ref()
        .map(|status| status.desired_number_scheduled)
        .unwrap_or(0);
    let ready = daemon_set
        .status
        .as_ref()
        .map(|status| status.number_ready)
        .unwrap_or(0);
    generic(
        &daemon_set.metadata,
        Some(format!("{ready}/{desired}")),
        vec![
            column("Desired", desired.to_string()),
            column("Ready", ready.to_string()),
        ],
        now,
    )
}

pub fn replica_set_view(replica_set: &ReplicaSet, now: DateTime<Utc>) -> GenericResourceView {
    let ready = replica_set
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    let desired = replica_set
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(0);
    generic(
        &replica_set.metadata,
        Some(format!("{ready}/{desired}")),
        vec![column("Ready", format!("{ready}/{desired}"))],
        now,
    )
}

/// Job status precedence: anything active is Running, then completion,
/// then failure, otherwise Pending.
pub fn job_view(job: &Job, now: DateTime<Utc>) -> GenericResourceView {
    let succeeded = job
        .status
        .as_ref()
        .and_then(|status| status.succeeded)
        .unwrap_or(0);
    let completions = job
        .spec
        .as_ref()
        .and_then(|spec| spec.completions)
        .unwrap_or(1);
    let active = job.status.as_ref().and_then(|status| status.active).unwrap_or(0);
    let failed = job.status.as_ref().and_then(|status| status.failed).unwrap_or(0);

    let status = if active > 0 {
        "Running"
    } else if succeeded >= completions {
        "Complete"
    } else if failed > 0 {
        "Failed"
    } else {
        "Pending"
    };

    generic(
        &job.metadata,
        Some(status.to_string()),
        vec![
            column("Completions", format!("{succeeded}/{completions}")),
            column("Status", status),
        ],
        now,
    )
}

pub fn cron_job_view(cron_job: &CronJob, now: DateTime<Utc>) -> GenericResourceView {
    let suspended = cron_job
        .spec
        .as_ref()
        .and_then(|spec| spec.suspend)
        .unwrap_or(false);
    generic(
        &cron_job.metadata,
        Some(if suspended { "Suspended" } else { "Active" }.to_string()),
        vec![
            column(
                "Schedule",
                cron_job
                    .spec
                    .as_ref()
                    .map(|spec| spec.schedule.clone())
                    .unwrap_or_default(),
            ),
            column(
                "Active",
                cron_job
                    .status
                    .as_ref()
                    .and_then(|status| status.active.as_ref())
                    .map(|active| active.len())
                    .unwrap_or(0)
                    .to_string(),
            ),
        ],
        now,
    )
}

pub fn ingress_view(ingress: &Ingress, now: DateTime<Utc>) -> GenericResourceView {
    let hosts = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .filter_map(|rule| rule.host.clone())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    generic(&ingress.metadata, None, vec![column("Hosts", hosts)], now)
}

pub fn endpoints_view(endpoints: &Endpoints, now: DateTime<Utc>) -> GenericResourceView {
    let addresses = endpoints
        .subsets
        .as_ref()
        .map(|subsets| {
            subsets
                .iter()
                .map(|subset| subset.addresses.as_ref().map(|a| a.len()).unwrap_or(0))
                .sum::<usize>()
        })
        .unwrap_or(0);
    generic(
        &endpoints.metadata,
        None,
        vec![column("Endpoints", addresses.to_string())],
        now,
    )
}

pub fn network_policy_view(policy: &NetworkPolicy, now: DateTime<Utc>) -> GenericResourceView {
    let types = policy
        .spec
        .as_ref()
        .and_then(|spec| spec.policy_types.as_ref())
        .map(|types| types.join(", "))
        .unwrap_or_default();
    generic(
        &policy.metadata,
        None,
        vec![column("Policy Types", types)],
        now,
    )
}

pub fn persistent_volume_view(volume: &PersistentVolume, now: DateTime<Utc>) -> GenericResourceView {
    let spec = volume.spec.as_ref();
    generic(
        &volume.metadata,
        volume.status.as_ref().and_then(|status| status.phase.clone()),
        vec![
            column(
                "Capacity",
                spec.and_then(|spec| spec.capacity.as_ref())
                    .and_then(|capacity| capacity.get("storage"))
                    .map(|quantity| quantity.0.clone())
                    .unwrap_or_default(),
            ),
            column(
                "Access Modes",
                spec.and_then(|spec| spec.access_modes.as_ref())
                    .map(|modes| modes.join(", "))
                    .unwrap_or_default(),
            ),
            column(
                "Reclaim",
                spec.and_then(|spec| spec.persistent_volume_reclaim_policy.clone())
                    .unwrap_or_default(),
            ),
            column(
                "Claim",
                spec.and_then(|spec| spec.claim_ref.as_ref())
                    .map(|claim| {
                        format!(
                            "{}/{}",
                            claim.namespace.clone().unwrap_or_default(),
                            claim.name.clone().unwrap_or_default()
                        )
                    })
                    .unwrap_or_default(),
            ),
        ],
        now,
    )
}

pub fn persistent_volume_claim_view(
    claim: &PersistentVolumeClaim,
    now: DateTime<Utc>,
) -> GenericResourceView {
    let status = claim.status.as_ref();
    generic(
        &claim.metadata,
        status.and_then(|status| status.phase.clone()),
        vec![
            column(
                "Capacity",
                status
                    .and_then(|status| status.capacity.as_ref())
                    .and_then(|capacity| capacity.get("storage"))
                    .map(|quantity| quantity.0.clone())
                    .unwrap_or_default(),
            ),
            column(
                "Access Modes",
                status
                    .and_then(|status| status.access_modes.as_ref())
                    .map(|modes| modes.join(", "))
                    .unwrap_or_default(),
            ),
            column(
                "Storage Class",
                claim
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.storage_class_name.clone())
                    .unwrap_or_default(),
            ),
            column(
                "Volume",
                claim
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.volume_name.clone())
                    .unwrap_or_default(),
            ),
        ],
        now,
    )
}

pub fn storage_class_view(class: &StorageClass, now: DateTime<Utc>) -> GenericResourceView {
    let is_default = class
        .metadata
        .annotations
        .as_ref()
        .is_some_and(|annotations| {
            annotations.contains_key("storageclass.kubernetes.io/is-default-class")
        });
    generic(
        &class.metadata,
        is_default.then(|| "Default".to_string()),
        vec![
            column("Provisioner", class.provisioner.clone()),
            column(
                "Reclaim Policy",
                class.reclaim_policy.clone().unwrap_or_default(),
            ),
            column(
                "Binding Mode",
                class.volume_binding_mode.clone().unwrap_or_default(),
            ),
        ],
        now,
    )
}

pub fn service_account_view(
    account: &k8s_openapi::api::core::v1::ServiceAccount,
    now: DateTime<Utc>,
) -> GenericResourceView {
    let secrets = account.secrets.as_ref().map(|s| s.len()).unwrap_or(0);
    generic(
        &account.metadata,
        None,
        vec![column("Secrets", secrets.to_string())],
        now,
    )
}

pub fn horizontal_pod_autoscaler_view(
    autoscaler: &k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler,
    now: DateTime<Utc>,
) -> GenericResourceView {
    let spec = autoscaler.spec.as_ref();
    let target = spec
        .map(|spec| {
            format!(
                "{}/{}",
                spec.scale_target_ref.kind, spec.scale_target_ref.name
            )
        })
        .unwrap_or_default();
    let min = spec.and_then(|spec| spec.min_replicas).unwrap_or(1);
    let max = spec.map(|spec| spec.max_replicas).unwrap_or(0);
    let current = autoscaler
        .status
        .as_ref()
        .and_then(|status| status.current_replicas)
        .unwrap_or(0);
    generic(
        &autoscaler.metadata,
        Some(format!("{current} replicas")),
        vec![
            column("Target", target),
            column("Min", min.to_string()),
            column("Max", max.to_string()),
        ],
        now,
    )
}

/// Counts and a pod-phase histogram. Only the four known phases are counted;
/// pods in an unknown phase contribute to `pods_count` but to no bucket.
pub fn cluster_summary(
    name: &str,
    server: &str,
    version: &str,
    nodes: &[Node],
    namespaces: &[Namespace],
    pods: &[Pod],
    deployments: &[Deployment],
    services: &[Service],
) -> ClusterSummary {
    let phase_count = |phase: &str| {
        pods.iter()
            .filter(|pod| {
                pod.status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    == Some(phase)
            })
            .count()
    };

    ClusterSummary {
        name: name.to_string(),
        server: server.to_string(),
        version: version.to_string(),
        nodes_count: nodes.len(),
        namespaces_count: namespaces.len(),
        pods_count: pods.len(),
        deployments_count: deployments.len(),
        services_count: services.len(),
        running_pods: phase_count("Running"),
        pending_pods: phase_count("Pending"),
        failed_pods: phase_count("Failed"),
        succeeded_pods: phase_count("Succeeded"),
    }
}

fn usage_from_value(usage: &Value) -> (u64, u64) {
    let cpu = usage
        .get("cpu")
        .and_then(Value::as_str)
        .map(parse_cpu_millis)
        .unwrap_or(0);
    let memory = usage
        .get("memory")
        .and_then(Value::as_str)
        .map(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

/// Sums container usage from one raw pod-metrics object.
pub fn pod_metrics_usage(pod_metrics: &Value) -> (u64, u64) {
    pod_metrics
        .get("containers")
        .and_then(Value::as_array)
        .map(|containers| {
            containers.iter().fold((0u64, 0u64), |(cpu, memory), container| {
                let (container_cpu, container_memory) = container
                    .get("usage")
                    .map(usage_from_value)
                    .unwrap_or((0, 0));
                (
                    cpu.saturating_add(container_cpu),
                    memory.saturating_add(container_memory),
                )
            })
        })
        .unwrap_or((0, 0))
}

/// Cluster usage versus allocatable capacity. Usage is summed over pod
/// metrics (namespace-scoped when asked), capacity over all nodes. Metrics
/// unavailability is an expected condition: any failure yields an all-zero
/// summary with `metrics_available` unset instead of an error.
pub async fn usage_summary(
    provider: &dyn ClusterProvider,
    scope: &NamespaceScope,
) -> ResourceUsageSummary {
    let pod_metrics = match provider.list_pod_metrics(scope).await {
        Ok(items) => items,
        Err(error) => {
            debug!("metrics backend unavailable: {error:#}");
            return ResourceUsageSummary::default();
        }
    };

    let mut cpu_used = 0u64;
    let mut memory_used = 0u64;
    for item in &pod_metrics {
        let (cpu, memory) = pod_metrics_usage(item);
        cpu_used = cpu_used.saturating_add(cpu);
        memory_used = memory_used.saturating_add(memory);
    }

    // Capacity is cluster-wide regardless of scope; node listing is
    // best-effort here.
    let nodes = provider.list_nodes().await.unwrap_or_default();
    let mut cpu_capacity = 0u64;
    let mut memory_capacity = 0u64;
    for node in &nodes {
        let Some(allocatable) = node
            .status
            .as_ref()
            .and_then(|status| status.allocatable.as_ref())
        else {
            continue;
        };
        cpu_capacity = cpu_capacity.saturating_add(
            allocatable
                .get("cpu")
                .map(|quantity| parse_cpu_millis(&quantity.0))
                .unwrap_or(0),
        );
        memory_capacity = memory_capacity.saturating_add(
            allocatable
                .get("memory")
                .map(|quantity| parse_memory_bytes(&quantity.0))
                .unwrap_or(0),
        );
    }

    ResourceUsageSummary {
        cpu_used_millis: cpu_used,
        cpu_capacity_millis: cpu_capacity,
        memory_used_bytes: memory_used,
        memory_capacity_bytes: memory_capacity,
        metrics_available: true,
    }
}

/// Counts pods scheduled across the given nodes against their summed pod
/// capacity. A single node's failing pod list is skipped, never fatal.
pub async fn pod_fill_sample(
    provider: &dyn ClusterProvider,
    nodes: &[NodeView],
) -> (usize, usize) {
    let mut total_pods = 0usize;
    let mut total_capacity = 0usize;
    for node in nodes {
        match provider.list_pods_on_node(&node.name).await {
            Ok(pods) => total_pods += pods.len(),
            Err(error) => debug!("pod count for node {} unavailable: {error:#}", node.name),
        }
        total_capacity += node.pods.parse::<usize>().unwrap_or(0);
    }
    (total_pods, total_capacity)
}
