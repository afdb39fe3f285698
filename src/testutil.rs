use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, stream};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, NodeStatus, PersistentVolume,
    PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use crate::model::{NamespaceScope, ResourceKind};
use crate::provider::ClusterProvider;

/// Canned in-memory cluster for tests. `version: None` makes the stub look
/// unreachable; `pod_metrics: None` makes the metrics backend unavailable;
/// `fail_lists` turns every list call into an error.
#[derive(Default)]
pub struct StubProvider {
    pub version: Option<String>,
    pub server: String,
    pub namespaces: Vec<Namespace>,
    pub pods: Vec<Pod>,
    pub pods_by_node: BTreeMap<String, Vec<Pod>>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub nodes: Vec<Node>,
    pub events: Vec<Event>,
    pub config_maps: Vec<ConfigMap>,
    pub secrets: Vec<Secret>,
    pub stateful_sets: Vec<StatefulSet>,
    pub daemon_sets: Vec<DaemonSet>,
    pub replica_sets: Vec<ReplicaSet>,
    pub jobs: Vec<Job>,
    pub cron_jobs: Vec<CronJob>,
    pub ingresses: Vec<Ingress>,
    pub endpoints: Vec<Endpoints>,
    pub network_policies: Vec<NetworkPolicy>,
    pub persistent_volumes: Vec<PersistentVolume>,
    pub persistent_volume_claims: Vec<PersistentVolumeClaim>,
    pub storage_classes: Vec<StorageClass>,
    pub service_accounts: Vec<ServiceAccount>,
    pub autoscalers: Vec<HorizontalPodAutoscaler>,
    pub pod_metrics: Option<Vec<Value>>,
    pub logs: String,
    pub fail_lists: bool,
    pub fail_pods_on_node: Option<String>,
    pub deleted: Mutex<Vec<(ResourceKind, String, Option<String>)>>,
}

impl StubProvider {
    pub fn meta(name: &str, namespace: Option<&str>, uid: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
            uid: Some(uid.to_string()),
            ..ObjectMeta::default()
        }
    }

    pub fn pod(name: &str, namespace: &str, uid: &str) -> Pod {
        Pod {
            metadata: Self::meta(name, Some(namespace), uid),
            ..Pod::default()
        }
    }

    pub fn node(name: &str, cpu: &str, memory: &str, pods: &str) -> Node {
        Node {
            metadata: Self::meta(name, None, name),
            status: Some(NodeStatus {
                allocatable: Some(
                    [
                        ("cpu".to_string(), Quantity(cpu.to_string())),
                        ("memory".to_string(), Quantity(memory.to_string())),
                        ("pods".to_string(), Quantity(pods.to_string())),
                    ]
                    .into(),
                ),
                ..NodeStatus::default()
            }),
            ..Node::default()
        }
    }

    fn listed<T: Clone>(&self, items: &[T]) -> Result<Vec<T>> {
        if self.fail_lists {
            return Err(anyhow!("list failed"));
        }
        Ok(items.to_vec())
    }

    fn scoped_pods(&self, scope: &NamespaceScope) -> Vec<Pod> {
        match scope.named() {
            None => self.pods.clone(),
            Some(namespace) => self
                .pods
                .iter()
                .filter(|pod| pod.metadata.namespace.as_deref() == Some(namespace))
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl ClusterProvider for StubProvider {
    async fn version(&self) -> Result<String> {
        self.version
            .clone()
            .ok_or_else(|| anyhow!("connection refused"))
    }

    fn server_url(&self) -> String {
        self.server.clone()
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        self.listed(&self.namespaces)
    }

    async fn list_pods(&self, scope: &NamespaceScope) -> Result<Vec<Pod>> {
        if self.fail_lists {
            return Err(anyhow!("list failed"));
        }
        Ok(self.scoped_pods(scope))
    }

    async fn list_pods_on_node(&self, node: &str) -> Result<Vec<Pod>> {
        if self.fail_pods_on_node.as_deref() == Some(node) {
            return Err(anyhow!("node {node} is unreachable"));
        }
        Ok(self.pods_by_node.get(node).cloned().unwrap_or_default())
    }

    async fn list_deployments(&self, _scope: &NamespaceScope) -> Result<Vec<Deployment>> {
        self.listed(&self.deployments)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        self.deployments
            .iter()
            .find(|deployment| {
                deployment.metadata.name.as_deref() == Some(name)
                    && deployment.metadata.namespace.as_deref() == Some(namespace)
            })
            .cloned()
            .ok_or_else(|| anyhow!("deployment {namespace}/{name} not found"))
    }

    async fn list_services(&self, _scope: &NamespaceScope) -> Result<Vec<Service>> {
        self.listed(&self.services)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.listed(&self.nodes)
    }

    async fn list_events(&self, _scope: &NamespaceScope) -> Result<Vec<Event>> {
        self.listed(&self.events)
    }

    async fn list_events_for_node(&self, node: &str) -> Result<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|event| event.involved_object.name.as_deref() == Some(node))
            .cloned()
            .collect())
    }

    async fn list_config_maps(&self, _scope: &NamespaceScope) -> Result<Vec<ConfigMap>> {
        self.listed(&self.config_maps)
    }

    async fn list_secrets(&self, _scope: &NamespaceScope) -> Result<Vec<Secret>> {
        self.listed(&self.secrets)
    }

    async fn list_stateful_sets(&self, _scope: &NamespaceScope) -> Result<Vec<StatefulSet>> {
        self.listed(&self.stateful_sets)
    }

    async fn list_daemon_sets(&self, _scope: &NamespaceScope) -> Result<Vec<DaemonSet>> {
        self.listed(&self.daemon_sets)
    }

    async fn list_replica_sets(&self, _scope: &NamespaceScope) -> Result<Vec<ReplicaSet>> {
        self.listed(&self.replica_sets)
    }

    async fn list_jobs(&self, _scope: &NamespaceScope) -> Result<Vec<Job>> {
        self.listed(&self.jobs)
    }

    async fn list_cron_jobs(&self, _scope: &NamespaceScope) -> Result<Vec<CronJob>> {
        self.listed(&self.cron_jobs)
    }

    async fn list_ingresses(&self, _scope: &NamespaceScope) -> Result<Vec<Ingress>> {
        self.listed(&self.ingresses)
    }

    async fn list_endpoints(&self, _scope: &NamespaceScope) -> Result<Vec<Endpoints>> {
        self.listed(&self.endpoints)
    }

    async fn list_network_policies(&self, _scope: &NamespaceScope) -> Result<Vec<NetworkPolicy>> {
        self.listed(&self.network_policies)
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>> {
        self.listed(&self.persistent_volumes)
    }

    async fn list_persistent_volume_claims(
        &self,
        _scope: &NamespaceScope,
    ) -> Result<Vec<PersistentVolumeClaim>> {
        self.listed(&self.persistent_volume_claims)
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>> {
        self.listed(&self.storage_classes)
    }

    async fn list_service_accounts(&self, _scope: &NamespaceScope) -> Result<Vec<ServiceAccount>> {
        self.listed(&self.service_accounts)
    }

    async fn list_horizontal_pod_autoscalers(
        &self,
        _scope: &NamespaceScope,
    ) -> Result<Vec<HorizontalPodAutoscaler>> {
        self.listed(&self.autoscalers)
    }

    async fn list_pod_metrics(&self, _scope: &NamespaceScope) -> Result<Vec<Value>> {
        self.pod_metrics
            .clone()
            .ok_or_else(|| anyhow!("metrics.k8s.io is not available"))
    }

    async fn get_logs(
        &self,
        _namespace: &str,
        _pod_name: &str,
        _container: Option<&str>,
        _tail_lines: i64,
    ) -> Result<String> {
        Ok(self.logs.clone())
    }

    async fn stream_logs(
        &self,
        _namespace: &str,
        _pod_name: &str,
        _container: Option<&str>,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let lines = self
            .logs
            .lines()
            .map(|line| Ok(line.to_string()))
            .collect::<Vec<_>>();
        Ok(stream::iter(lines).boxed())
    }

    async fn get_yaml(
        &self,
        kind: ResourceKind,
        name: &str,
        _namespace: Option<&str>,
    ) -> Result<String> {
        Ok(format!("kind: {}\nmetadata:\n  name: {name}\n", kind.title()))
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push((kind, name.to_string(), namespace.map(str::to_string)));
        }
        Ok(())
    }
}
