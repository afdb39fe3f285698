use std::fmt::Debug;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{AsyncBufReadExt, StreamExt, TryStreamExt};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Endpoints, Event, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    Secret, Service, ServiceAccount,
};
use k8s_openapi::api::networking::v1::{Ingress, NetworkPolicy};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::model::{NamespaceScope, ResourceKind};
use crate::provider::ClusterProvider;

/// Live cluster access through kube-rs. One instance per connected context.
#[derive(Clone)]
pub struct KubeProvider {
    client: Client,
    server: String,
}

impl KubeProvider {
    /// Builds a client for the given kubeconfig context, or the current
    /// context (falling back to in-cluster inference) when none is given.
    pub async fn connect(context: Option<&str>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig) = kubeconfig {
            let options = KubeConfigOptions {
                context: context.map(str::to_string),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .context("failed to load Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!("kubeconfig not found; context switching is unavailable");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let server = config.cluster_url.to_string();
        let client =
            Client::try_from(config).context("failed to initialize Kubernetes client")?;
        info!("connected to {server}");

        Ok(Self { client, server })
    }

    /// Context names from the local kubeconfig, sorted. Empty when no
    /// kubeconfig exists.
    pub fn available_contexts() -> Vec<String> {
        let Ok(kubeconfig) = Kubeconfig::read() else {
            return Vec::new();
        };
        let mut contexts = kubeconfig
            .contexts
            .iter()
            .map(|context| context.name.clone())
            .collect::<Vec<_>>();
        contexts.sort();
        contexts.dedup();
        contexts
    }

    pub fn default_context() -> Option<String> {
        Kubeconfig::read().ok().and_then(|cfg| cfg.current_context)
    }

    fn scoped_api<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    async fn list_scoped<K>(&self, scope: &NamespaceScope) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = self.scoped_api(scope);
        Ok(api.list(&list_params()).await?.items)
    }

    async fn list_cluster<K>(&self) -> Result<Vec<K>>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.list(&list_params()).await?.items)
    }

    async fn namespaced_yaml<K>(&self, namespace: &str, name: &str) -> Result<String>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let object = api.get(name).await?;
        Ok(serde_yaml::to_string(&object)?)
    }

    async fn cluster_yaml<K>(&self, name: &str) -> Result<String>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let object = api.get(name).await?;
        Ok(serde_yaml::to_string(&object)?)
    }

    async fn namespaced_delete<K>(&self, namespace: &str, name: &str) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let _ = api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn cluster_delete<K>(&self, name: &str) -> Result<()>
    where
        K: Resource<Scope = ClusterResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let _ = api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    fn require_namespace<'a>(
        kind: ResourceKind,
        namespace: Option<&'a str>,
    ) -> Result<&'a str> {
        namespace.with_context(|| format!("namespace is required for {}", kind.title()))
    }
}

#[async_trait]
impl ClusterProvider for KubeProvider {
    async fn version(&self) -> Result<String> {
        let info = self
            .client
            .apiserver_version()
            .await
            .context("failed to query server version")?;
        if info.git_version.is_empty() {
            Ok(format!("{}.{}", info.major, info.minor))
        } else {
            Ok(info.git_version)
        }
    }

    fn server_url(&self) -> String {
        self.server.clone()
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        self.list_cluster().await
    }

    async fn list_pods(&self, scope: &NamespaceScope) -> Result<Vec<Pod>> {
        self.list_scoped(scope).await
    }

    async fn list_pods_on_node(&self, node: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = list_params().fields(&format!("spec.nodeName={node}"));
        Ok(api.list(&params).await?.items)
    }

    async fn list_deployments(&self, scope: &NamespaceScope) -> Result<Vec<Deployment>> {
        self.list_scoped(scope).await
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn list_services(&self, scope: &NamespaceScope) -> Result<Vec<Service>> {
        self.list_scoped(scope).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.list_cluster().await
    }

    async fn list_events(&self, scope: &NamespaceScope) -> Result<Vec<Event>> {
        self.list_scoped(scope).await
    }

    async fn list_events_for_node(&self, node: &str) -> Result<Vec<Event>> {
        let api: Api<Event> = Api::all(self.client.clone());
        let params = list_params().fields(&format!(
            "involvedObject.kind=Node,involvedObject.name={node}"
        ));
        Ok(api.list(&params).await?.items)
    }

    async fn list_config_maps(&self, scope: &NamespaceScope) -> Result<Vec<ConfigMap>> {
        self.list_scoped(scope).await
    }

    async fn list_secrets(&self, scope: &NamespaceScope) -> Result<Vec<Secret>> {
        self.list_scoped(scope).await
    }

    async fn list_stateful_sets(&self, scope: &NamespaceScope) -> Result<Vec<StatefulSet>> {
        self.list_scoped(scope).await
    }

    async fn list_daemon_sets(&self, scope: &NamespaceScope) -> Result<Vec<DaemonSet>> {
        self.list_scoped(scope).await
    }

    async fn list_replica_sets(&self, scope: &NamespaceScope) -> Result<Vec<ReplicaSet>> {
        self.list_scoped(scope).await
    }

    async fn list_jobs(&self, scope: &NamespaceScope) -> Result<Vec<Job>> {
        self.list_scoped(scope).await
    }

    async fn list_cron_jobs(&self, scope: &NamespaceScope) -> Result<Vec<CronJob>> {
        self.list_scoped(scope).await
    }

    async fn list_ingresses(&self, scope: &NamespaceScope) -> Result<Vec<Ingress>> {
        self.list_scoped(scope).await
    }

    async fn list_endpoints(&self, scope: &NamespaceScope) -> Result<Vec<Endpoints>> {
        self.list_scoped(scope).await
    }

    async fn list_network_policies(&self, scope: &NamespaceScope) -> Result<Vec<NetworkPolicy>> {
        self.list_scoped(scope).await
    }

    async fn list_persistent_volumes(&self) -> Result<Vec<PersistentVolume>> {
        self.list_cluster().await
    }

    async fn list_persistent_volume_claims(
        &self,
        scope: &NamespaceScope,
    ) -> Result<Vec<PersistentVolumeClaim>> {
        self.list_scoped(scope).await
    }

    async fn list_storage_classes(&self) -> Result<Vec<StorageClass>> {
        self.list_cluster().await
    }

    async fn list_service_accounts(&self, scope: &NamespaceScope) -> Result<Vec<ServiceAccount>> {
        self.list_scoped(scope).await
    }

    async fn list_horizontal_pod_autoscalers(
        &self,
        scope: &NamespaceScope,
    ) -> Result<Vec<HorizontalPodAutoscaler>> {
        self.list_scoped(scope).await
    }

    async fn list_pod_metrics(&self, scope: &NamespaceScope) -> Result<Vec<Value>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let list = api.list(&list_params()).await?;
        Ok(list.into_iter().map(|metrics| metrics.data).collect())
    }

    async fn get_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: Option<&str>,
        tail_lines: i64,
    ) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(str::to_string),
            tail_lines: Some(tail_lines),
            timestamps: true,
            ..LogParams::default()
        };

        pods.logs(pod_name, &params)
            .await
            .with_context(|| format!("failed to load logs for {namespace}/{pod_name}"))
    }

    async fn stream_logs(
        &self,
        namespace: &str,
        pod_name: &str,
        container: Option<&str>,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: container.map(str::to_string),
            follow: true,
            tail_lines: Some(100),
            ..LogParams::default()
        };

        let reader = pods
            .log_stream(pod_name, &params)
            .await
            .with_context(|| format!("failed to follow logs for {namespace}/{pod_name}"))?;
        Ok(reader.lines().map_err(anyhow::Error::from).boxed())
    }

    async fn get_yaml(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String> {
        if kind.namespaced() {
            let namespace = Self::require_namespace(kind, namespace)?;
            match kind {
                ResourceKind::Pod => self.namespaced_yaml::<Pod>(namespace, name).await,
                ResourceKind::Deployment => {
                    self.namespaced_yaml::<Deployment>(namespace, name).await
                }
                ResourceKind::Service => self.namespaced_yaml::<Service>(namespace, name).await,
                ResourceKind::Event => self.namespaced_yaml::<Event>(namespace, name).await,
                ResourceKind::ConfigMap => {
                    self.namespaced_yaml::<ConfigMap>(namespace, name).await
                }
                ResourceKind::Secret => self.namespaced_yaml::<Secret>(namespace, name).await,
                ResourceKind::StatefulSet => {
                    self.namespaced_yaml::<StatefulSet>(namespace, name).await
                }
                ResourceKind::DaemonSet => {
                    self.namespaced_yaml::<DaemonSet>(namespace, name).await
                }
                ResourceKind::ReplicaSet => {
                    self.namespaced_yaml::<ReplicaSet>(namespace, name).await
                }
                ResourceKind::Job => self.namespaced_yaml::<Job>(namespace, name).await,
                ResourceKind::CronJob => self.namespaced_yaml::<CronJob>(namespace, name).await,
                ResourceKind::Ingress => self.namespaced_yaml::<Ingress>(namespace, name).await,
                ResourceKind::Endpoints => {
                    self.namespaced_yaml::<Endpoints>(namespace, name).await
                }
                ResourceKind::NetworkPolicy => {
                    self.namespaced_yaml::<NetworkPolicy>(namespace, name).await
                }
                ResourceKind::PersistentVolumeClaim => {
                    self.namespaced_yaml::<PersistentVolumeClaim>(namespace, name)
                        .await
                }
                ResourceKind::ServiceAccount => {
                    self.namespaced_yaml::<ServiceAccount>(namespace, name).await
                }
                ResourceKind::HorizontalPodAutoscaler => {
                    self.namespaced_yaml::<HorizontalPodAutoscaler>(namespace, name)
                        .await
                }
                _ => anyhow::bail!("manifest view is not supported for {}", kind.title()),
            }
        } else {
            match kind {
                ResourceKind::Node => self.cluster_yaml::<Node>(name).await,
                ResourceKind::Namespace => self.cluster_yaml::<Namespace>(name).await,
                ResourceKind::PersistentVolume => {
                    self.cluster_yaml::<PersistentVolume>(name).await
                }
                ResourceKind::StorageClass => self.cluster_yaml::<StorageClass>(name).await,
                _ => anyhow::bail!("manifest view is not supported for {}", kind.title()),
            }
        }
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<()> {
        if kind.namespaced() {
            let namespace = Self::require_namespace(kind, namespace)?;
            match kind {
                ResourceKind::Pod => self.namespaced_delete::<Pod>(namespace, name).await,
                ResourceKind::Deployment => {
                    self.namespaced_delete::<Deployment>(namespace, name).await
                }
                ResourceKind::Service => self.namespaced_delete::<Service>(namespace, name).await,
                ResourceKind::ConfigMap => {
                    self.namespaced_delete::<ConfigMap>(namespace, name).await
                }
                ResourceKind::Secret => self.namespaced_delete::<Secret>(namespace, name).await,
                ResourceKind::StatefulSet => {
                    self.namespaced_delete::<StatefulSet>(namespace, name).await
                }
                ResourceKind::DaemonSet => {
                    self.namespaced_delete::<DaemonSet>(namespace, name).await
                }
                ResourceKind::ReplicaSet => {
                    self.namespaced_delete::<ReplicaSet>(namespace, name).await
                }
                ResourceKind::Job => self.namespaced_delete::<Job>(namespace, name).await,
                ResourceKind::CronJob => self.namespaced_delete::<CronJob>(namespace, name).await,
                ResourceKind::Ingress => self.namespaced_delete::<Ingress>(namespace, name).await,
                ResourceKind::Endpoints => {
                    self.namespaced_delete::<Endpoints>(namespace, name).await
                }
                ResourceKind::NetworkPolicy => {
                    self.namespaced_delete::<NetworkPolicy>(namespace, name).await
                }
                ResourceKind::PersistentVolumeClaim => {
                    self.namespaced_delete::<PersistentVolumeClaim>(namespace, name)
                        .await
                }
                ResourceKind::ServiceAccount => {
                    self.namespaced_delete::<ServiceAccount>(namespace, name).await
                }
                ResourceKind::HorizontalPodAutoscaler => {
                    self.namespaced_delete::<HorizontalPodAutoscaler>(namespace, name)
                        .await
                }
                _ => anyhow::bail!("delete is not supported for {}", kind.title()),
            }
        } else {
            match kind {
                ResourceKind::Node => self.cluster_delete::<Node>(name).await,
                ResourceKind::Namespace => self.cluster_delete::<Namespace>(name).await,
                ResourceKind::PersistentVolume => {
                    self.cluster_delete::<PersistentVolume>(name).await
                }
                ResourceKind::StorageClass => self.cluster_delete::<StorageClass>(name).await,
                _ => anyhow::bail!("delete is not supported for {}", kind.title()),
            }
        }
    }
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}
