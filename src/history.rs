use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::aggregate::{node_views, pod_fill_sample, usage_summary};
use crate::model::{NamespaceScope, PollState, ResourceUsageSummary};
use crate::poll::{PollConfig, PollSession};
use crate::provider::ClusterProvider;

/// Bounded sample window for sparkline rendering. Oldest sample is evicted
/// once the window is full.
#[derive(Debug, Clone)]
pub struct UsageHistory {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl UsageHistory {
    pub const DEFAULT_CAPACITY: usize = 20;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for UsageHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn fraction(used: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        (used as f64 / capacity as f64).clamp(0.0, 1.0)
    }
}

fn snapshot(history: &Mutex<UsageHistory>) -> Vec<f64> {
    history.lock().map(|h| h.samples()).unwrap_or_default()
}

/// Polls cluster usage and keeps rolling cpu, memory and pod-fill fraction
/// histories for the overview gauges. Usage polling and pod counting run as
/// separate sessions so a slow per-node pod walk never delays the usage
/// summary. Samples are only recorded while the metrics backend responds.
pub struct UsageMonitor {
    usage: PollSession<ResourceUsageSummary>,
    _pod_fill: PollSession<(usize, usize)>,
    cpu: Arc<Mutex<UsageHistory>>,
    memory: Arc<Mutex<UsageHistory>>,
    pods: Arc<Mutex<UsageHistory>>,
    observers: Vec<JoinHandle<()>>,
}

impl UsageMonitor {
    pub fn spawn(
        provider: Arc<dyn ClusterProvider>,
        scope: NamespaceScope,
        interval: Duration,
    ) -> Self {
        let usage = {
            let provider = provider.clone();
            let scope = scope.clone();
            PollSession::spawn(PollConfig::new(interval), move || {
                let provider = provider.clone();
                let scope = scope.clone();
                async move { Ok(usage_summary(provider.as_ref(), &scope).await) }
            })
        };

        let pod_fill = {
            let provider = provider.clone();
            PollSession::spawn(PollConfig::new(interval), move || {
                let provider = provider.clone();
                async move {
                    let nodes = provider.list_nodes().await?;
                    let views = node_views(&nodes, Utc::now());
                    Ok(pod_fill_sample(provider.as_ref(), &views).await)
                }
            })
        };

        let cpu = Arc::new(Mutex::new(UsageHistory::default()));
        let memory = Arc::new(Mutex::new(UsageHistory::default()));
        let pods = Arc::new(Mutex::new(UsageHistory::default()));
        let mut observers = Vec::new();

        {
            let mut rx = usage.subscribe();
            let cpu = cpu.clone();
            let memory = memory.clone();
            observers.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let summary = {
                        let state = rx.borrow_and_update();
                        state.success().cloned()
                    };
                    if let Some(summary) = summary
                        && summary.metrics_available
                    {
                        if let Ok(mut history) = cpu.lock() {
                            history.push(fraction(
                                summary.cpu_used_millis,
                                summary.cpu_capacity_millis,
                            ));
                        }
                        if let Ok(mut history) = memory.lock() {
                            history.push(fraction(
                                summary.memory_used_bytes,
                                summary.memory_capacity_bytes,
                            ));
                        }
                    }
                }
            }));
        }

        {
            let mut rx = pod_fill.subscribe();
            let pods = pods.clone();
            observers.push(tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let sample = {
                        let state = rx.borrow_and_update();
                        state.success().copied()
                    };
                    if let Some((scheduled, capacity)) = sample
                        && let Ok(mut history) = pods.lock()
                    {
                        history.push(fraction(scheduled as u64, capacity as u64));
                    }
                }
            }));
        }

        Self {
            usage,
            _pod_fill: pod_fill,
            cpu,
            memory,
            pods,
            observers,
        }
    }

    /// Latest usage summary state.
    pub fn usage(&self) -> PollState<ResourceUsageSummary> {
        self.usage.state()
    }

    pub fn cpu_history(&self) -> Vec<f64> {
        snapshot(&self.cpu)
    }

    pub fn memory_history(&self) -> Vec<f64> {
        snapshot(&self.memory)
    }

    pub fn pods_history(&self) -> Vec<f64> {
        snapshot(&self.pods)
    }
}

impl Drop for UsageMonitor {
    fn drop(&mut self) {
        for observer in &self.observers {
            observer.abort();
        }
    }
}
