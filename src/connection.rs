use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::k8s::KubeProvider;
use crate::provider::ClusterProvider;

/// Owns the single live cluster handle. Connecting to a new context always
/// tears the previous handle down first, and a handle is only adopted after
/// a version round trip proves the cluster reachable. A failed connect leaves
/// the manager disconnected rather than holding a dead handle.
#[derive(Default)]
pub struct ConnectionManager {
    provider: Option<Arc<dyn ClusterProvider>>,
    context: Option<String>,
    version: String,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<Arc<dyn ClusterProvider>> {
        self.provider.clone()
    }

    pub fn current_context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Server version captured at connect time.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn server_url(&self) -> String {
        self.provider
            .as_ref()
            .map(|provider| provider.server_url())
            .unwrap_or_default()
    }

    pub fn disconnect(&mut self) {
        if let Some(context) = self.context.take() {
            info!("disconnected from context {context}");
        }
        self.provider = None;
        self.version.clear();
    }

    /// Verifies the handle with a version call and adopts it. On failure the
    /// manager stays disconnected.
    pub async fn install(
        &mut self,
        context: Option<String>,
        provider: Arc<dyn ClusterProvider>,
    ) -> Result<String> {
        self.disconnect();
        let version = provider
            .version()
            .await
            .context("cluster is not reachable")?;
        info!(
            "connected to context {} (server {version})",
            context.as_deref().unwrap_or("<current>")
        );
        self.provider = Some(provider);
        self.context = context;
        self.version = version.clone();
        Ok(version)
    }

    /// Connects to a kubeconfig context by name, or the current context when
    /// `None`.
    pub async fn connect(&mut self, context: Option<&str>) -> Result<String> {
        let provider = KubeProvider::connect(context).await?;
        let context = context
            .map(str::to_string)
            .or_else(KubeProvider::default_context);
        self.install(context, Arc::new(provider)).await
    }

    /// Contexts available for switching. Empty when no kubeconfig exists.
    pub fn list_contexts(&self) -> Vec<String> {
        KubeProvider::available_contexts()
    }
}
