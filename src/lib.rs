pub mod aggregate;
pub mod app;
pub mod connection;
pub mod graph;
pub mod history;
pub mod k8s;
pub mod model;
pub mod poll;
pub mod provider;
pub mod select;

#[cfg(test)]
mod testutil;

pub use app::{Dashboard, Intent, Screen, ScreenSnapshot};
pub use connection::ConnectionManager;
pub use k8s::KubeProvider;
pub use model::{NamespaceScope, PollState, ResourceKind};
pub use poll::{LogStream, PollConfig, PollSession, RefreshCadence};
pub use provider::ClusterProvider;
