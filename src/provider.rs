use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::storage::v1::StorageClass;
use serde_json::Value;

use crate::model::{NamespaceScope, ResourceKind};

/// Raw cluster access behind the aggregation layer. One handle per connected
/// context, owned by the connection manager; polling sessions share it for
/// reads only. List calls return raw API objects so the aggregators stay
/// pure and testable.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    /// Lightweight round trip used to confirm reachability ("major.minor").
    async fn version(&self) -> Result<String>;

    fn server_url(&self) -> String;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;
    async fn list_pods(&self, scope: &NamespaceScope) -> Result<Vec<Pod>>;
    async fn list_pods_on_node(&self, node: &str) -> Result<Vec<Pod>>;
    async fn list_deployments(&self, scope: &NamespaceScope) -> Result<Vec<Deployment>>;
    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment>;
    async fn list_services(&self, scope: &NamespaceScope) -> Result<Vec<Service>>;
    async fn list_nodes(&self) -> Result<Vec<Node>>;
    async fn list_events(&self, scope: &NamespaceScope) -> Result<Vec<Event>>;
    async fn list_events_for_node(&self, node: &str) -> Result<Vec<Event>>;

    async fn list_config_maps(&self, scope: &NamespaceScope) -> Result<Vec<ConfigMap>>;
    async fn list_secrets(&self, scope: &NamespaceScope) -> Result<Vec<Secret>>;
    async fn list_stateful_sets(&self, scope: &NamespaceScope) -> Result<Vec<StatefulSet>>;
    async fn list_daemon_sets(&self, scope: &NamespaceScope) -> Result<Vec<DaemonSet>>;
    async fn list_replica_sets(&self, scope: &NamespaceScope) -> Result<Vec<ReplicaSet>>;
    async fn list_jobs(&self, scope: &NamespaceScope) -> Result<Vec<Job>>;
    async fn list_cron_jobs(&self, scope: &NamespaceScope) -> Result<Vec<CronJob>>;
    async fn list_ingresses(&self, scope: &NamespaceScope) -> Result<Vec<Ingress>>;
    async fn list_endpoints(&self, scope: &NamespaceScope) -> Result<Vec<Endpoints>>;
    async fn list_network_policies(&self, scope: &NamespaceScope) -> Result<Vec<NetworkPolicy>>;
    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>>;
    async fn list_persistent_volume_claims(
        &self,
        scope: &NamespaceScope,
    ) -> Result<Vec<PersistentVolumeClaim>>;
    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>>;
    async fn list_service_accounts(&self, scope: &NamespaceScope) -> Result<Vec<ServiceAccount>>;
    async fn list_horizontal_pod_autoscalers(
        &self,
        scope: &NamespaceScope,
    ) -> Result<Vec<HorizontalPodAutoscaler>>;

    /// Raw pod metrics objects from the metrics.k8s.io group. Callers treat
    /// any failure here as "metrics backend unavailable", never fatal.
    async fn list_pod_metrics(&self, scope: &NamespaceScope) -> Result<Vec<Value>>;

    async fn get_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String>;

    /// Follow a pod's log as a line stream. Dropping the stream closes the
    /// underlying connection.
    async fn stream_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: Option<&str>,
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// Serialized manifest of one object. Unsupported kinds are a caller
    /// error.
    async fn get_yaml(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String>;

    async fn delete(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()>;
}
