use std::collections::BTreeSet;

use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::aggregate::effective_pod_status;
use crate::model::{GraphEdge, GraphNode, NamespaceScope, ResourceGraph};
use crate::provider::ClusterProvider;

/// Fixed display rank per kind: traffic sources on top, workload chain in the
/// middle, mounted configuration at the bottom. Unknown kinds sink below
/// everything.
pub fn kind_rank(kind: &str) -> u8 {
    match kind {
        "Ingress" => 0,
        "Service" => 1,
        "HorizontalPodAutoscaler" => 2,
        "Deployment" => 3,
        "ReplicaSet" => 4,
        "Pod" => 5,
        "ConfigMap" | "Secret" | "PersistentVolumeClaim" | "ServiceAccount" => 6,
        _ => 99,
    }
}

/// Nodes grouped into display rows by kind rank, each row sorted by name.
pub fn layers(graph: &ResourceGraph) -> Vec<Vec<GraphNode>> {
    let mut ordered = graph.nodes.clone();
    ordered.sort_by(|a, b| {
        kind_rank(&a.kind)
            .cmp(&kind_rank(&b.kind))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut rows: Vec<Vec<GraphNode>> = Vec::new();
    for node in ordered {
        match rows.last_mut() {
            Some(row) if kind_rank(&row[0].kind) == kind_rank(&node.kind) => row.push(node),
            _ => rows.push(vec![node]),
        }
    }
    rows
}

fn node_id(kind: &str, name: &str) -> String {
    format!("{kind}/{name}")
}

fn owned_by(meta: &ObjectMeta, owner_uid: &str) -> bool {
    meta.owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|reference| reference.uid == owner_uid))
}

fn selector_matches(
    selector: &std::collections::BTreeMap<String, String>,
    labels: Option<&std::collections::BTreeMap<String, String>>,
) -> bool {
    let Some(labels) = labels else {
        return false;
    };
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

/// Config objects a pod references: mounted volumes, env sources and the
/// service account. Names only, the objects themselves are not fetched.
fn pod_config_references(pod: &Pod) -> Vec<(&'static str, String)> {
    let Some(spec) = pod.spec.as_ref() else {
        return Vec::new();
    };
    let mut references = Vec::new();

    for volume in spec.volumes.as_deref().unwrap_or(&[]) {
        if let Some(name) = volume.config_map.as_ref().map(|cm| cm.name.clone()) {
            references.push(("ConfigMap", name));
        }
        if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.clone()) {
            references.push(("Secret", name));
        }
        if let Some(claim) = volume.persistent_volume_claim.as_ref() {
            references.push(("PersistentVolumeClaim", claim.claim_name.clone()));
        }
    }

    for container in &spec.containers {
        for source in container.env_from.as_deref().unwrap_or(&[]) {
            if let Some(name) = source.config_map_ref.as_ref().map(|r| r.name.clone()) {
                references.push(("ConfigMap", name));
            }
            if let Some(name) = source.secret_ref.as_ref().map(|r| r.name.clone()) {
                references.push(("Secret", name));
            }
        }
    }

    if let Some(account) = spec.service_account_name.clone()
        && account != "default"
    {
        references.push(("ServiceAccount", account));
    }

    references
}

struct GraphBuilder {
    graph: ResourceGraph,
    seen_nodes: BTreeSet<String>,
    seen_edges: BTreeSet<(String, String)>,
}

impl GraphBuilder {
    fn new() -> Self {
        Self {
            graph: ResourceGraph::default(),
            seen_nodes: BTreeSet::new(),
            seen_edges: BTreeSet::new(),
        }
    }

    fn node(&mut self, kind: &str, name: &str, status: Option<String>) -> String {
        let id = node_id(kind, name);
        if self.seen_nodes.insert(id.clone()) {
            self.graph.nodes.push(GraphNode {
                id: id.clone(),
                kind: kind.to_string(),
                name: name.to_string(),
                status,
            });
        }
        id
    }

    fn edge(&mut self, source: &str, target: &str) {
        if self
            .seen_edges
            .insert((source.to_string(), target.to_string()))
        {
            self.graph.edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
            });
        }
    }
}

/// Assembles the relationship graph around one deployment from already
/// fetched namespace listings. Ownership is by uid, service membership by
/// label selector, ingress membership by backend service name.
pub fn build_deployment_graph(
    deployment: &Deployment,
    replica_sets: &[ReplicaSet],
    pods: &[Pod],
    services: &[Service],
    ingresses: &[Ingress],
    autoscalers: &[HorizontalPodAutoscaler],
) -> ResourceGraph {
    let mut builder = GraphBuilder::new();

    let deployment_name = deployment.metadata.name.clone().unwrap_or_default();
    let deployment_uid = deployment.metadata.uid.clone().unwrap_or_default();
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
    let deployment_id = builder.node(
        "Deployment",
        &deployment_name,
        Some(format!("{ready}/{desired}")),
    );

    let mut included_pods: Vec<&Pod> = Vec::new();
    for replica_set in replica_sets {
        if !owned_by(&replica_set.metadata, &deployment_uid) {
            continue;
        }
        let rs_name = replica_set.metadata.name.clone().unwrap_or_default();
        let rs_uid = replica_set.metadata.uid.clone().unwrap_or_default();
        let rs_ready = replica_set
            .status
            .as_ref()
            .and_then(|status| status.ready_replicas)
            .unwrap_or(0);
        let rs_desired = replica_set
            .spec
            .as_ref()
            .and_then(|spec| spec.replicas)
            .unwrap_or(0);
        let rs_id = builder.node(
            "ReplicaSet",
            &rs_name,
            Some(format!("{rs_ready}/{rs_desired}")),
        );
        builder.edge(&deployment_id, &rs_id);

        for pod in pods {
            if !owned_by(&pod.metadata, &rs_uid) {
                continue;
            }
            let pod_name = pod.metadata.name.clone().unwrap_or_default();
            let pod_id = builder.node("Pod", &pod_name, Some(effective_pod_status(pod)));
            builder.edge(&rs_id, &pod_id);
            included_pods.push(pod);

            for (kind, reference) in pod_config_references(pod) {
                let config_id = builder.node(kind, &reference, None);
                builder.edge(&pod_id, &config_id);
            }
        }
    }

    let mut included_services: BTreeSet<String> = BTreeSet::new();
    for service in services {
        let Some(selector) = service.spec.as_ref().and_then(|spec| spec.selector.as_ref()) else {
            continue;
        };
        let matching: Vec<&&Pod> = included_pods
            .iter()
            .filter(|pod| selector_matches(selector, pod.metadata.labels.as_ref()))
            .collect();
        if matching.is_empty() {
            continue;
        }

        let service_name = service.metadata.name.clone().unwrap_or_default();
        let service_type = service.spec.as_ref().and_then(|spec| spec.type_.clone());
        let service_id = builder.node("Service", &service_name, service_type);
        included_services.insert(service_name);
        for pod in matching {
            let pod_name = pod.metadata.name.clone().unwrap_or_default();
            builder.edge(&service_id, &node_id("Pod", &pod_name));
        }
    }

    for ingress in ingresses {
        let backends: Vec<String> = ingress
            .spec
            .as_ref()
            .and_then(|spec| spec.rules.as_ref())
            .map(|rules| {
                rules
                    .iter()
                    .flat_map(|rule| rule.http.as_ref().map(|http| &http.paths))
                    .flatten()
                    .filter_map(|path| path.backend.service.as_ref())
                    .map(|backend| backend.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        let targets: Vec<&String> = backends
            .iter()
            .filter(|name| included_services.contains(*name))
            .collect();
        if targets.is_empty() {
            continue;
        }

        let ingress_name = ingress.metadata.name.clone().unwrap_or_default();
        let ingress_id = builder.node("Ingress", &ingress_name, None);
        for target in targets {
            builder.edge(&ingress_id, &node_id("Service", target));
        }
    }

    for autoscaler in autoscalers {
        let Some(spec) = autoscaler.spec.as_ref() else {
            continue;
        };
        let target = &spec.scale_target_ref;
        if target.kind != "Deployment" || target.name != deployment_name {
            continue;
        }
        let hpa_name = autoscaler.metadata.name.clone().unwrap_or_default();
        let current = autoscaler
            .status
            .as_ref()
            .map(|status| status.current_replicas.unwrap_or(0))
            .unwrap_or(0);
        let hpa_id = builder.node(
            "HorizontalPodAutoscaler",
            &hpa_name,
            Some(format!("{current} replicas")),
        );
        builder.edge(&hpa_id, &deployment_id);
    }

    builder.graph
}

/// Fetches everything the graph needs from one namespace and assembles it.
pub async fn deployment_graph(
    provider: &dyn ClusterProvider,
    namespace: &str,
    name: &str,
) -> Result<ResourceGraph> {
    let scope = NamespaceScope::Named(namespace.to_string());
    let deployment = provider
        .get_deployment(namespace, name)
        .await
        .with_context(|| format!("deployment {namespace}/{name} not found"))?;
    let replica_sets = provider.list_replica_sets(&scope).await?;
    let pods = provider.list_pods(&scope).await?;
    let services = provider.list_services(&scope).await?;
    let ingresses = provider.list_ingresses(&scope).await.unwrap_or_default();
    let autoscalers = provider
        .list_horizontal_pod_autoscalers(&scope)
        .await
        .unwrap_or_default();

    Ok(build_deployment_graph(
        &deployment,
        &replica_sets,
        &pods,
        &services,
        &ingresses,
        &autoscalers,
    ))
}
