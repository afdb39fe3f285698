use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Kubernetes resource kinds the dashboard knows how to list, inspect and
/// delete. Kind tokens are case-insensitive and accept the usual kubectl
/// short names.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
    Node,
    Namespace,
    Event,
    ConfigMap,
    Secret,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    Ingress,
    Endpoints,
    NetworkPolicy,
    PersistentVolume,
    PersistentVolumeClaim,
    StorageClass,
    ServiceAccount,
    HorizontalPodAutoscaler,
}

impl ResourceKind {
    pub const GENERIC: [Self; 13] = [
        Self::ConfigMap,
        Self::Secret,
        Self::StatefulSet,
        Self::DaemonSet,
        Self::ReplicaSet,
        Self::Job,
        Self::CronJob,
        Self::Ingress,
        Self::Endpoints,
        Self::NetworkPolicy,
        Self::PersistentVolume,
        Self::PersistentVolumeClaim,
        Self::StorageClass,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::Node => "Node",
            Self::Namespace => "Namespace",
            Self::Event => "Event",
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::StatefulSet => "StatefulSet",
            Self::DaemonSet => "DaemonSet",
            Self::ReplicaSet => "ReplicaSet",
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Ingress => "Ingress",
            Self::Endpoints => "Endpoints",
            Self::NetworkPolicy => "NetworkPolicy",
            Self::PersistentVolume => "PersistentVolume",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::StorageClass => "StorageClass",
            Self::ServiceAccount => "ServiceAccount",
            Self::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pod),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployment),
            "svc" | "service" | "services" => Some(Self::Service),
            "node" | "nodes" | "no" => Some(Self::Node),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespace),
            "event" | "events" | "ev" => Some(Self::Event),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMap)
            }
            "secret" | "secrets" => Some(Self::Secret),
            "sts" | "statefulset" | "statefulsets" => Some(Self::StatefulSet),
            "ds" | "daemonset" | "daemonsets" | "daemon-set" | "daemon-sets" => {
                Some(Self::DaemonSet)
            }
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSet)
            }
            "job" | "jobs" => Some(Self::Job),
            "cj" | "cronjob" | "cronjobs" | "cron-job" | "cron-jobs" => Some(Self::CronJob),
            "ing" | "ingress" | "ingresses" => Some(Self::Ingress),
            "ep" | "endpoint" | "endpoints" => Some(Self::Endpoints),
            "np" | "networkpolicy" | "networkpolicies" | "network-policy" | "network-policies" => {
                Some(Self::NetworkPolicy)
            }
            "pv" | "persistentvolume" | "persistentvolumes" | "persistent-volume"
            | "persistent-volumes" => Some(Self::PersistentVolume),
            "pvc"
            | "persistentvolumeclaim"
            | "persistentvolumeclaims"
            | "persistent-volume-claim"
            | "persistent-volume-claims" => Some(Self::PersistentVolumeClaim),
            "sc" | "storageclass" | "storageclasses" | "storage-class" | "storage-classes" => {
                Some(Self::StorageClass)
            }
            "sa" | "serviceaccount" | "serviceaccounts" | "service-account"
            | "service-accounts" => Some(Self::ServiceAccount),
            "hpa" | "horizontalpodautoscaler" | "horizontalpodautoscalers" => {
                Some(Self::HorizontalPodAutoscaler)
            }
            _ => None,
        }
    }

    /// Cluster-scoped kinds carry no namespace in get/delete calls.
    pub fn namespaced(self) -> bool {
        !matches!(
            self,
            Self::Node | Self::Namespace | Self::PersistentVolume | Self::StorageClass
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn named(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Named(namespace) => Some(namespace),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

/// Lifecycle of one polled screen subscription. Created `Loading`; after the
/// first fetch it is `Success` or `Error`. A failed fetch after a prior
/// success keeps the stale `Success` value on display.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PollState<T> {
    Loading,
    Error(String),
    Success(T),
}

impl<T> PollState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ClusterSummary {
    pub name: String,
    pub server: String,
    pub version: String,
    pub nodes_count: usize,
    pub namespaces_count: usize,
    pub pods_count: usize,
    pub deployments_count: usize,
    pub services_count: usize,
    pub running_pods: usize,
    pub pending_pods: usize,
    pub failed_pods: usize,
    pub succeeded_pods: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct PodView {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub ready: String,
    pub restarts: u32,
    pub age: String,
    pub node: String,
    pub ip: String,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerView>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ContainerView {
    pub name: String,
    pub image: String,
    pub ready: bool,
    pub restarts: u32,
    pub state: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DeploymentView {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub ready: String,
    pub up_to_date: u32,
    pub available: u32,
    pub age: String,
    pub strategy: String,
    pub labels: BTreeMap<String, String>,
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ServiceView {
    pub uid: String,
    pub name: String,
    pub namespace: String,
    pub service_type: String,
    pub cluster_ip: String,
    pub ports: String,
    pub age: String,
    pub selector: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct NodeView {
    pub uid: String,
    pub name: String,
    pub status: String,
    pub roles: String,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub container_runtime: String,
    pub cpu: String,
    pub memory: String,
    pub pods: String,
    pub age: String,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct EventView {
    pub uid: String,
    pub event_type: String,
    pub reason: String,
    pub object_ref: String,
    pub message: String,
    pub count: i32,
    pub first_seen: String,
    pub last_seen: String,
    pub namespace: String,
}

/// One row of a generic resource screen. `extra_columns` is the per-kind
/// generalization point: an ordered list of derived header/value pairs that
/// lets a single table screen render a dozen different kinds.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct GenericResourceView {
    pub uid: String,
    pub name: String,
    pub namespace: Option<String>,
    pub status: Option<String>,
    pub age: String,
    pub labels: BTreeMap<String, String>,
    pub extra_columns: Vec<(String, String)>,
}

/// When `metrics_available` is false the metrics backend was unreachable and
/// all quantities are meaningless; they must not be rendered as real numbers.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ResourceUsageSummary {
    pub cpu_used_millis: u64,
    pub cpu_capacity_millis: u64,
    pub memory_used_bytes: u64,
    pub memory_capacity_bytes: u64,
    pub metrics_available: bool,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Ownership/reference relationships around a workload, edges pointing from
/// parent to child. Display layering is by kind rank, not graph depth.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ResourceGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

fn labels_match(labels: &BTreeMap<String, String>, query: &str) -> bool {
    labels
        .iter()
        .any(|(key, value)| contains_ignore_case(key, query) || contains_ignore_case(value, query))
}

/// Search-box filtering over list rows.
pub trait MatchesQuery {
    fn matches_query(&self, query: &str) -> bool;
}

impl MatchesQuery for PodView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.name, &query)
            || contains_ignore_case(&self.namespace, &query)
            || contains_ignore_case(&self.status, &query)
            || contains_ignore_case(&self.node, &query)
            || labels_match(&self.labels, &query)
    }
}

impl MatchesQuery for DeploymentView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.name, &query)
            || contains_ignore_case(&self.namespace, &query)
            || labels_match(&self.labels, &query)
    }
}

impl MatchesQuery for ServiceView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.name, &query)
            || contains_ignore_case(&self.namespace, &query)
            || contains_ignore_case(&self.service_type, &query)
            || labels_match(&self.labels, &query)
    }
}

impl MatchesQuery for NodeView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.name, &query)
            || contains_ignore_case(&self.roles, &query)
            || contains_ignore_case(&self.status, &query)
    }
}

impl MatchesQuery for EventView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.reason, &query)
            || contains_ignore_case(&self.object_ref, &query)
            || contains_ignore_case(&self.message, &query)
            || contains_ignore_case(&self.namespace, &query)
    }
}

impl MatchesQuery for GenericResourceView {
    fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        query.is_empty()
            || contains_ignore_case(&self.name, &query)
            || self
                .namespace
                .as_deref()
                .is_some_and(|namespace| contains_ignore_case(namespace, &query))
            || self
                .status
                .as_deref()
                .is_some_and(|status| contains_ignore_case(status, &query))
            || self
                .extra_columns
                .iter()
                .any(|(_, value)| contains_ignore_case(value, &query))
            || labels_match(&self.labels, &query)
    }
}
