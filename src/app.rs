use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::aggregate::{
    cluster_summary, config_map_view, cron_job_view, daemon_set_view, deployment_views,
    endpoints_view, event_views, horizontal_pod_autoscaler_view, ingress_view, job_view,
    namespace_view, network_policy_view, node_views, persistent_volume_claim_view,
    persistent_volume_view, pod_views, replica_set_view, secret_view, service_account_view,
    service_views, stateful_set_view, storage_class_view,
};
use crate::connection::ConnectionManager;
use crate::graph::deployment_graph;
use crate::history::UsageMonitor;
use crate::model::{
    ClusterSummary, DeploymentView, EventView, GenericResourceView, MatchesQuery, NamespaceScope,
    NodeView, PodView, PollState, ResourceGraph, ResourceKind, ResourceUsageSummary, ServiceView,
};
use crate::poll::{LogStream, PollConfig, PollSession, RefreshCadence};
use crate::provider::ClusterProvider;
use crate::select::{SelectionSlot, spawn_reconciler};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Screen {
    ClusterOverview,
    Pods,
    Deployments,
    Services,
    Nodes,
    Namespaces,
    Events,
    Generic(ResourceKind),
    ResourceDetail {
        kind: ResourceKind,
        name: String,
        namespace: Option<String>,
    },
    DeploymentGraph {
        namespace: String,
        name: String,
    },
    PodLogs {
        namespace: String,
        pod: String,
        container: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub enum Intent {
    Navigate(Screen),
    NavigateBack,
    Select(String),
    ClearSelection,
    SetNamespace(NamespaceScope),
    SetSearchQuery(String),
    SwitchContext(String),
    Disconnect,
    DeleteResource {
        kind: ResourceKind,
        name: String,
        namespace: Option<String>,
    },
}

/// What the current screen should render, filtered by the search query.
/// List data comes back by value so the caller never holds a lock into the
/// polling machinery.
#[derive(Debug, Clone)]
pub enum ScreenSnapshot {
    Disconnected,
    Overview {
        summary: PollState<ClusterSummary>,
        usage: PollState<ResourceUsageSummary>,
        cpu_history: Vec<f64>,
        memory_history: Vec<f64>,
        pods_history: Vec<f64>,
    },
    Pods(PollState<Vec<PodView>>),
    Deployments(PollState<Vec<DeploymentView>>),
    Services(PollState<Vec<ServiceView>>),
    Nodes(PollState<Vec<NodeView>>),
    Events(PollState<Vec<EventView>>),
    Generic {
        kind: ResourceKind,
        rows: PollState<Vec<GenericResourceView>>,
    },
    Detail {
        yaml: PollState<String>,
        /// Side-panel events, populated for node details only. Best-effort,
        /// empty when the lookup fails.
        events: Vec<EventView>,
    },
    Graph(PollState<ResourceGraph>),
    Logs(PollState<String>),
}

enum ActiveFeed {
    None,
    Overview {
        summary: PollSession<ClusterSummary>,
        monitor: UsageMonitor,
    },
    Pods {
        session: PollSession<Vec<PodView>>,
        _reconciler: JoinHandle<()>,
    },
    Deployments {
        session: PollSession<Vec<DeploymentView>>,
        _reconciler: JoinHandle<()>,
    },
    Services {
        session: PollSession<Vec<ServiceView>>,
        _reconciler: JoinHandle<()>,
    },
    Nodes {
        session: PollSession<Vec<NodeView>>,
        _reconciler: JoinHandle<()>,
    },
    Events(PollSession<Vec<EventView>>),
    Generic {
        kind: ResourceKind,
        session: PollSession<Vec<GenericResourceView>>,
        _reconciler: JoinHandle<()>,
    },
    Detail {
        yaml: PollSession<String>,
        events: Option<PollSession<Vec<EventView>>>,
    },
    Graph(PollSession<ResourceGraph>),
    Logs(PollSession<String>),
}

/// The whole dashboard behind the UI: a connection, one active screen with
/// its polling feed, and cross-screen state (namespace scope, search query,
/// selection). Changing screen, scope or context drops the old feed, so the
/// new one starts from `Loading` and nothing from the previous subscription
/// leaks through.
pub struct Dashboard {
    connection: ConnectionManager,
    cadence: RefreshCadence,
    screen: Screen,
    scope: NamespaceScope,
    query: String,
    selection: SelectionSlot,
    feed: ActiveFeed,
    back_stack: Vec<Screen>,
}

impl Dashboard {
    pub fn new(cadence: RefreshCadence) -> Self {
        Self {
            connection: ConnectionManager::new(),
            cadence,
            screen: Screen::ClusterOverview,
            scope: NamespaceScope::All,
            query: String::new(),
            selection: SelectionSlot::new(),
            feed: ActiveFeed::None,
            back_stack: Vec::new(),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    pub fn selection(&self) -> Option<String> {
        self.selection.selected()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn current_context(&self) -> Option<&str> {
        self.connection.current_context()
    }

    pub fn available_contexts(&self) -> Vec<String> {
        self.connection.list_contexts()
    }

    /// Connects to a kubeconfig context and starts the current screen's feed.
    pub async fn connect(&mut self, context: Option<&str>) -> Result<String> {
        let version = self.connection.connect(context).await?;
        self.rebuild_feed();
        Ok(version)
    }

    /// Adopts an already-built provider. This is the seam tests connect
    /// through.
    pub async fn install_provider(
        &mut self,
        context: Option<String>,
        provider: Arc<dyn ClusterProvider>,
    ) -> Result<String> {
        let version = self.connection.install(context, provider).await?;
        self.rebuild_feed();
        Ok(version)
    }

    /// Follows a pod's logs as a live stream, independent of the screen
    /// feed. Dropping the returned handle cancels the reader and closes the
    /// underlying stream.
    pub async fn follow_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
    ) -> Result<LogStream> {
        let provider = self
            .connection
            .provider()
            .context("not connected to a cluster")?;
        let stream = provider.stream_logs(namespace, pod, container).await?;
        Ok(LogStream::spawn(stream))
    }

    pub async fn apply(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::Navigate(screen) => {
                if screen != self.screen {
                    self.back_stack.push(self.screen.clone());
                    self.screen = screen;
                    self.selection.clear();
                    self.query.clear();
                    self.rebuild_feed();
                }
            }
            Intent::NavigateBack => {
                if let Some(previous) = self.back_stack.pop() {
                    self.screen = previous;
                    self.selection.clear();
                    self.query.clear();
                    self.rebuild_feed();
                }
            }
            Intent::Select(uid) => self.selection.select(uid),
            Intent::ClearSelection => self.selection.clear(),
            Intent::SetNamespace(scope) => {
                if self.scope != scope {
                    self.scope = scope;
                    self.selection.clear();
                    self.rebuild_feed();
                }
            }
            Intent::SetSearchQuery(query) => self.query = query,
            Intent::SwitchContext(context) => {
                self.connection.connect(Some(&context)).await?;
                self.scope = NamespaceScope::All;
                self.selection.clear();
                self.back_stack.clear();
                self.rebuild_feed();
            }
            Intent::Disconnect => {
                self.feed = ActiveFeed::None;
                self.back_stack.clear();
                self.connection.disconnect();
            }
            Intent::DeleteResource {
                kind,
                name,
                namespace,
            } => {
                let provider = self
                    .connection
                    .provider()
                    .context("not connected to a cluster")?;
                provider.delete(kind, &name, namespace.as_deref()).await?;
                info!("deleted {} {name}", kind.title());
                // The next poll tick drops the row and the reconciler clears
                // any selection pointing at it.
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        match &self.feed {
            ActiveFeed::None => ScreenSnapshot::Disconnected,
            ActiveFeed::Overview { summary, monitor } => ScreenSnapshot::Overview {
                summary: summary.state(),
                usage: monitor.usage(),
                cpu_history: monitor.cpu_history(),
                memory_history: monitor.memory_history(),
                pods_history: monitor.pods_history(),
            },
            ActiveFeed::Pods { session, .. } => {
                ScreenSnapshot::Pods(filtered(session.state(), &self.query))
            }
            ActiveFeed::Deployments { session, .. } => {
                ScreenSnapshot::Deployments(filtered(session.state(), &self.query))
            }
            ActiveFeed::Services { session, .. } => {
                ScreenSnapshot::Services(filtered(session.state(), &self.query))
            }
            ActiveFeed::Nodes { session, .. } => {
                ScreenSnapshot::Nodes(filtered(session.state(), &self.query))
            }
            ActiveFeed::Events(session) => {
                ScreenSnapshot::Events(filtered(session.state(), &self.query))
            }
            ActiveFeed::Generic { kind, session, .. } => ScreenSnapshot::Generic {
                kind: *kind,
                rows: filtered(session.state(), &self.query),
            },
            ActiveFeed::Detail { yaml, events } => ScreenSnapshot::Detail {
                yaml: yaml.state(),
                events: events
                    .as_ref()
                    .and_then(|session| session.state().success().cloned())
                    .unwrap_or_default(),
            },
            ActiveFeed::Graph(session) => ScreenSnapshot::Graph(session.state()),
            ActiveFeed::Logs(session) => ScreenSnapshot::Logs(session.state()),
        }
    }

    /// Tears the current feed down and starts the one the active screen
    /// needs. A no-op into `None` while disconnected.
    fn rebuild_feed(&mut self) {
        self.feed = ActiveFeed::None;
        let Some(provider) = self.connection.provider() else {
            return;
        };

        let fast = PollConfig::new(self.cadence.fast);
        let slow = PollConfig::new(self.cadence.slow);
        let scope = self.scope.clone();

        self.feed = match self.screen.clone() {
            Screen::ClusterOverview => {
                let context = self
                    .connection
                    .current_context()
                    .unwrap_or_default()
                    .to_string();
                let server = self.connection.server_url();
                let version = self.connection.version().to_string();
                let summary = {
                    let provider = provider.clone();
                    let scope = scope.clone();
                    PollSession::spawn(slow, move || {
                        let provider = provider.clone();
                        let scope = scope.clone();
                        let context = context.clone();
                        let server = server.clone();
                        let version = version.clone();
                        async move {
                            let (nodes, namespaces, pods, deployments, services) = futures::try_join!(
                                provider.list_nodes(),
                                provider.list_namespaces(),
                                provider.list_pods(&scope),
                                provider.list_deployments(&scope),
                                provider.list_services(&scope),
                            )?;
                            Ok(cluster_summary(
                                &context,
                                &server,
                                &version,
                                &nodes,
                                &namespaces,
                                &pods,
                                &deployments,
                                &services,
                            ))
                        }
                    })
                };
                let monitor = UsageMonitor::spawn(provider, scope, self.cadence.slow);
                ActiveFeed::Overview { summary, monitor }
            }
            Screen::Pods => {
                let session = PollSession::spawn(fast, {
                    let provider = provider.clone();
                    let scope = scope.clone();
                    move || {
                        let provider = provider.clone();
                        let scope = scope.clone();
                        async move {
                            let pods = provider.list_pods(&scope).await?;
                            Ok(pod_views(&pods, Utc::now()))
                        }
                    }
                });
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Pods {
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::Deployments => {
                let session = PollSession::spawn(fast, {
                    let provider = provider.clone();
                    let scope = scope.clone();
                    move || {
                        let provider = provider.clone();
                        let scope = scope.clone();
                        async move {
                            let deployments = provider.list_deployments(&scope).await?;
                            Ok(deployment_views(&deployments, Utc::now()))
                        }
                    }
                });
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Deployments {
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::Services => {
                let session = PollSession::spawn(fast, {
                    let provider = provider.clone();
                    let scope = scope.clone();
                    move || {
                        let provider = provider.clone();
                        let scope = scope.clone();
                        async move {
                            let services = provider.list_services(&scope).await?;
                            Ok(service_views(&services, Utc::now()))
                        }
                    }
                });
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Services {
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::Nodes => {
                let session = PollSession::spawn(slow, {
                    let provider = provider.clone();
                    move || {
                        let provider = provider.clone();
                        async move {
                            let nodes = provider.list_nodes().await?;
                            Ok(node_views(&nodes, Utc::now()))
                        }
                    }
                });
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Nodes {
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::Namespaces => {
                let session = PollSession::spawn(slow, {
                    let provider = provider.clone();
                    move || {
                        let provider = provider.clone();
                        async move {
                            let namespaces = provider.list_namespaces().await?;
                            Ok(namespaces
                                .iter()
                                .map(|namespace| namespace_view(namespace, Utc::now()))
                                .collect())
                        }
                    }
                });
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Generic {
                    kind: ResourceKind::Namespace,
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::Events => {
                let session = PollSession::spawn(fast, {
                    let provider = provider.clone();
                    let scope = scope.clone();
                    move || {
                        let provider = provider.clone();
                        let scope = scope.clone();
                        async move {
                            let events = provider.list_events(&scope).await?;
                            Ok(event_views(&events, Utc::now()))
                        }
                    }
                });
                ActiveFeed::Events(session)
            }
            Screen::Generic(kind) => {
                let session = spawn_generic_feed(provider, kind, scope, fast);
                let reconciler = spawn_reconciler(session.subscribe(), self.selection.clone());
                ActiveFeed::Generic {
                    kind,
                    session,
                    _reconciler: reconciler,
                }
            }
            Screen::ResourceDetail {
                kind,
                name,
                namespace,
            } => {
                let yaml = PollSession::spawn(slow, {
                    let provider = provider.clone();
                    let name = name.clone();
                    move || {
                        let provider = provider.clone();
                        let name = name.clone();
                        let namespace = namespace.clone();
                        async move { provider.get_yaml(kind, &name, namespace.as_deref()).await }
                    }
                });
                // Node details carry a side panel of the node's own events.
                let events = (kind == ResourceKind::Node).then(|| {
                    PollSession::spawn(slow, {
                        let provider = provider.clone();
                        move || {
                            let provider = provider.clone();
                            let name = name.clone();
                            async move {
                                let events = provider
                                    .list_events_for_node(&name)
                                    .await
                                    .unwrap_or_default();
                                Ok(event_views(&events, Utc::now()))
                            }
                        }
                    })
                });
                ActiveFeed::Detail { yaml, events }
            }
            Screen::DeploymentGraph { namespace, name } => {
                let session = PollSession::spawn(slow, {
                    let provider = provider.clone();
                    move || {
                        let provider = provider.clone();
                        let namespace = namespace.clone();
                        let name = name.clone();
                        async move {
                            deployment_graph(provider.as_ref(), &namespace, &name).await
                        }
                    }
                });
                ActiveFeed::Graph(session)
            }
            Screen::PodLogs {
                namespace,
                pod,
                container,
            } => {
                let session = PollSession::spawn(PollConfig::new(self.cadence.logs), {
                    let provider = provider.clone();
                    move || {
                        let provider = provider.clone();
                        let namespace = namespace.clone();
                        let pod = pod.clone();
                        let container = container.clone();
                        async move {
                            provider
                                .get_logs(&namespace, &pod, container.as_deref(), 500)
                                .await
                        }
                    }
                });
                ActiveFeed::Logs(session)
            }
        };
    }
}

fn spawn_generic_feed(
    provider: Arc<dyn ClusterProvider>,
    kind: ResourceKind,
    scope: NamespaceScope,
    config: PollConfig,
) -> PollSession<Vec<GenericResourceView>> {
    PollSession::spawn(config, move || {
        let provider = provider.clone();
        let scope = scope.clone();
        async move {
            let now = Utc::now();
            let rows = match kind {
                ResourceKind::ConfigMap => provider
                    .list_config_maps(&scope)
                    .await?
                    .iter()
                    .map(|item| config_map_view(item, now))
                    .collect(),
                ResourceKind::Secret => provider
                    .list_secrets(&scope)
                    .await?
                    .iter()
                    .map(|item| secret_view(item, now))
                    .collect(),
                ResourceKind::StatefulSet => provider
                    .list_stateful_sets(&scope)
                    .await?
                    .iter()
                    .map(|item| stateful_set_view(item, now))
                    .collect(),
                ResourceKind::DaemonSet => provider
                    .list_daemon_sets(&scope)
                    .await?
                    .iter()
                    .map(|item| daemon_set_view(item, now))
                    .collect(),
                ResourceKind::ReplicaSet => provider
                    .list_replica_sets(&scope)
                    .await?
                    .iter()
                    .map(|item| replica_set_view(item, now))
                    .collect(),
                ResourceKind::Job => provider
                    .list_jobs(&scope)
                    .await?
                    .iter()
                    .map(|item| job_view(item, now))
                    .collect(),
                ResourceKind::CronJob => provider
                    .list_cron_jobs(&scope)
                    .await?
                    .iter()
                    .map(|item| cron_job_view(item, now))
                    .collect(),
                ResourceKind::Ingress => provider
                    .list_ingresses(&scope)
                    .await?
                    .iter()
                    .map(|item| ingress_view(item, now))
                    .collect(),
                ResourceKind::Endpoints => provider
                    .list_endpoints(&scope)
                    .await?
                    .iter()
                    .map(|item| endpoints_view(item, now))
                    .collect(),
                ResourceKind::NetworkPolicy => provider
                    .list_network_policies(&scope)
                    .await?
                    .iter()
                    .map(|item| network_policy_view(item, now))
                    .collect(),
                ResourceKind::PersistentVolume => provider
                    .list_persistent_volumes()
                    .await?
                    .iter()
                    .map(|item| persistent_volume_view(item, now))
                    .collect(),
                ResourceKind::PersistentVolumeClaim => provider
                    .list_persistent_volume_claims(&scope)
                    .await?
                    .iter()
                    .map(|item| persistent_volume_claim_view(item, now))
                    .collect(),
                ResourceKind::StorageClass => provider
                    .list_storage_classes()
                    .await?
                    .iter()
                    .map(|item| storage_class_view(item, now))
                    .collect(),
                ResourceKind::ServiceAccount => provider
                    .list_service_accounts(&scope)
                    .await?
                    .iter()
                    .map(|item| service_account_view(item, now))
                    .collect(),
                ResourceKind::HorizontalPodAutoscaler => provider
                    .list_horizontal_pod_autoscalers(&scope)
                    .await?
                    .iter()
                    .map(|item| horizontal_pod_autoscaler_view(item, now))
                    .collect(),
                ResourceKind::Namespace => provider
                    .list_namespaces()
                    .await?
                    .iter()
                    .map(|item| namespace_view(item, now))
                    .collect(),
                other => anyhow::bail!("{} has a dedicated screen", other.title()),
            };
            Ok(rows)
        }
    })
}

fn filtered<T: MatchesQuery>(state: PollState<Vec<T>>, query: &str) -> PollState<Vec<T>> {
    match state {
        PollState::Success(rows) => PollState::Success(
            rows.into_iter()
                .filter(|row| row.matches_query(query))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{Dashboard, Intent, Screen, ScreenSnapshot};
    use crate::model::{NamespaceScope, ResourceKind};
    use crate::poll::RefreshCadence;
    use crate::testutil::StubProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn stub_with_pods() -> StubProvider {
        let mut stub = StubProvider::default();
        stub.version = Some("v1.30.0".to_string());
        stub.server = "https://stub:6443".to_string();
        stub.pods = vec![
            StubProvider::pod("api-1", "prod", "u1"),
            StubProvider::pod("api-2", "prod", "u2"),
            StubProvider::pod("worker-1", "batch", "u3"),
        ];
        stub
    }

    async fn connected_dashboard(stub: StubProvider) -> Dashboard {
        let mut dashboard = Dashboard::new(RefreshCadence::default());
        dashboard
            .install_provider(Some("test".to_string()), Arc::new(stub))
            .await
            .unwrap();
        dashboard
    }

    fn pod_rows(snapshot: ScreenSnapshot) -> Vec<String> {
        let ScreenSnapshot::Pods(state) = snapshot else {
            panic!("expected pods snapshot");
        };
        state
            .success()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|pod| pod.name)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn pods_screen_polls_and_snapshots() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let names = pod_rows(dashboard.snapshot());
        assert_eq!(names, vec!["api-1", "api-2", "worker-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn search_query_filters_snapshot_rows() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        dashboard
            .apply(Intent::SetSearchQuery("api".to_string()))
            .await
            .unwrap();
        assert_eq!(pod_rows(dashboard.snapshot()), vec!["api-1", "api-2"]);

        dashboard
            .apply(Intent::SetSearchQuery(String::new()))
            .await
            .unwrap();
        assert_eq!(pod_rows(dashboard.snapshot()).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_restarts_feed_from_loading() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pod_rows(dashboard.snapshot()).is_empty());

        dashboard
            .apply(Intent::Navigate(Screen::Nodes))
            .await
            .unwrap();
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();

        // Fresh feed, no stale rows from the previous subscription.
        let ScreenSnapshot::Pods(state) = dashboard.snapshot() else {
            panic!("expected pods snapshot");
        };
        assert!(state.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn namespace_change_clears_selection_and_restarts() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        dashboard.apply(Intent::Select("u3".to_string())).await.unwrap();

        dashboard
            .apply(Intent::SetNamespace(NamespaceScope::Named(
                "prod".to_string(),
            )))
            .await
            .unwrap();
        assert_eq!(dashboard.selection(), None);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pod_rows(dashboard.snapshot()), vec!["api-1", "api-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn selection_cleared_when_pod_disappears() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        dashboard.apply(Intent::Select("u1".to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        // Pod still listed, selection survives the next poll.
        assert_eq!(dashboard.selection(), Some("u1".to_string()));

        dashboard.apply(Intent::Select("gone".to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(dashboard.selection(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_goes_through_the_provider() {
        let stub = Arc::new(stub_with_pods());
        let mut dashboard = Dashboard::new(RefreshCadence::default());
        dashboard
            .install_provider(Some("test".to_string()), stub.clone())
            .await
            .unwrap();

        dashboard
            .apply(Intent::DeleteResource {
                kind: ResourceKind::Pod,
                name: "api-1".to_string(),
                namespace: Some("prod".to_string()),
            })
            .await
            .unwrap();

        let deleted = stub.deleted.lock().unwrap();
        assert_eq!(
            *deleted,
            vec![(
                ResourceKind::Pod,
                "api-1".to_string(),
                Some("prod".to_string())
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failing_lists_surface_as_error_state() {
        let mut stub = stub_with_pods();
        stub.fail_lists = true;
        let mut dashboard = connected_dashboard(stub).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Pods(state) = dashboard.snapshot() else {
            panic!("expected pods snapshot");
        };
        assert_eq!(state.error(), Some("list failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn generic_screen_lists_config_maps() {
        let mut stub = stub_with_pods();
        stub.config_maps = vec![k8s_openapi::api::core::v1::ConfigMap {
            metadata: StubProvider::meta("app-config", Some("prod"), "cm1"),
            data: Some([("key".to_string(), "value".to_string())].into()),
            ..Default::default()
        }];
        let mut dashboard = connected_dashboard(stub).await;
        dashboard
            .apply(Intent::Navigate(Screen::Generic(ResourceKind::ConfigMap)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Generic { kind, rows } = dashboard.snapshot() else {
            panic!("expected generic snapshot");
        };
        assert_eq!(kind, ResourceKind::ConfigMap);
        let rows = rows.success().cloned().unwrap();
        assert_eq!(rows[0].name, "app-config");
        assert_eq!(rows[0].extra_columns[0], ("Data".to_string(), "1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn back_navigation_returns_to_previous_screen() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        dashboard
            .apply(Intent::Navigate(Screen::ResourceDetail {
                kind: ResourceKind::Pod,
                name: "api-1".to_string(),
                namespace: Some("prod".to_string()),
            }))
            .await
            .unwrap();

        dashboard.apply(Intent::NavigateBack).await.unwrap();
        assert_eq!(dashboard.screen(), &Screen::Pods);

        dashboard.apply(Intent::NavigateBack).await.unwrap();
        assert_eq!(dashboard.screen(), &Screen::ClusterOverview);

        // Nothing left to pop.
        dashboard.apply(Intent::NavigateBack).await.unwrap();
        assert_eq!(dashboard.screen(), &Screen::ClusterOverview);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_drops_the_feed() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard.apply(Intent::Navigate(Screen::Pods)).await.unwrap();
        dashboard.apply(Intent::Disconnect).await.unwrap();

        assert!(!dashboard.is_connected());
        assert!(matches!(
            dashboard.snapshot(),
            ScreenSnapshot::Disconnected
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_cluster_refuses_connection() {
        let mut dashboard = Dashboard::new(RefreshCadence::default());
        let stub = StubProvider::default();
        assert!(
            dashboard
                .install_provider(Some("dead".to_string()), Arc::new(stub))
                .await
                .is_err()
        );
        assert!(!dashboard.is_connected());
        assert!(matches!(
            dashboard.snapshot(),
            ScreenSnapshot::Disconnected
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn deployment_graph_screen_builds_ownership_chain() {
        use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

        let owner = |kind: &str, name: &str, uid: &str| OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: uid.to_string(),
            ..OwnerReference::default()
        };

        let mut stub = stub_with_pods();
        stub.deployments = vec![Deployment {
            metadata: StubProvider::meta("web", Some("prod"), "d1"),
            ..Deployment::default()
        }];
        let mut rs_meta = StubProvider::meta("web-5f6", Some("prod"), "rs1");
        rs_meta.owner_references = Some(vec![owner("Deployment", "web", "d1")]);
        stub.replica_sets = vec![ReplicaSet {
            metadata: rs_meta,
            ..ReplicaSet::default()
        }];
        let mut pod = StubProvider::pod("web-5f6-abc", "prod", "p1");
        pod.metadata.owner_references = Some(vec![owner("ReplicaSet", "web-5f6", "rs1")]);
        stub.pods = vec![pod];

        let mut dashboard = connected_dashboard(stub).await;
        dashboard
            .apply(Intent::Navigate(Screen::DeploymentGraph {
                namespace: "prod".to_string(),
                name: "web".to_string(),
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Graph(state) = dashboard.snapshot() else {
            panic!("expected graph snapshot");
        };
        let graph = state.success().cloned().unwrap();
        let ids: Vec<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
        assert!(ids.contains(&"Deployment/web"));
        assert!(ids.contains(&"ReplicaSet/web-5f6"));
        assert!(ids.contains(&"Pod/web-5f6-abc"));
        assert!(graph.edges.iter().any(|edge| {
            edge.source == "Deployment/web" && edge.target == "ReplicaSet/web-5f6"
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn node_detail_includes_node_events() {
        use k8s_openapi::api::core::v1::{Event, ObjectReference};

        let mut stub = stub_with_pods();
        stub.events = vec![Event {
            metadata: StubProvider::meta("node-1.evt", Some("default"), "ev1"),
            involved_object: ObjectReference {
                kind: Some("Node".to_string()),
                name: Some("node-1".to_string()),
                ..ObjectReference::default()
            },
            reason: Some("NodeNotReady".to_string()),
            message: Some("kubelet stopped posting status".to_string()),
            type_: Some("Warning".to_string()),
            ..Event::default()
        }];

        let mut dashboard = connected_dashboard(stub).await;
        dashboard
            .apply(Intent::Navigate(Screen::ResourceDetail {
                kind: ResourceKind::Node,
                name: "node-1".to_string(),
                namespace: None,
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Detail { yaml, events } = dashboard.snapshot() else {
            panic!("expected detail snapshot");
        };
        assert!(yaml.success().is_some());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, "NodeNotReady");
    }

    #[tokio::test(start_paused = true)]
    async fn pod_detail_has_no_event_panel() {
        let mut dashboard = connected_dashboard(stub_with_pods()).await;
        dashboard
            .apply(Intent::Navigate(Screen::ResourceDetail {
                kind: ResourceKind::Pod,
                name: "api-1".to_string(),
                namespace: Some("prod".to_string()),
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Detail { events, .. } = dashboard.snapshot() else {
            panic!("expected detail snapshot");
        };
        assert!(events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn followed_logs_accumulate_stream_lines() {
        let mut stub = stub_with_pods();
        stub.logs = "line one\nline two".to_string();
        let dashboard = connected_dashboard(stub).await;

        let stream = dashboard.follow_logs("prod", "api-1", None).await.unwrap();
        let mut rx = stream.subscribe();
        while rx.changed().await.is_ok() {}

        assert_eq!(
            *rx.borrow(),
            crate::model::PollState::Success("line one\nline two".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pod_logs_screen_polls_log_text() {
        let mut stub = stub_with_pods();
        stub.logs = "line one\nline two".to_string();
        let mut dashboard = connected_dashboard(stub).await;
        dashboard
            .apply(Intent::Navigate(Screen::PodLogs {
                namespace: "prod".to_string(),
                pod: "api-1".to_string(),
                container: None,
            }))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ScreenSnapshot::Logs(state) = dashboard.snapshot() else {
            panic!("expected logs snapshot");
        };
        assert_eq!(state.success().map(String::as_str), Some("line one\nline two"));
    }
}
