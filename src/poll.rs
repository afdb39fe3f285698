use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::PollState;

/// Per-screen refresh intervals. Fast-changing resources (pods, deployments,
/// events) poll on `fast`, slow-changing ones (nodes, cluster summary) on
/// `slow`, log tailing on `logs`.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCadence {
    pub fast: Duration,
    pub slow: Duration,
    pub logs: Duration,
}

impl Default for RefreshCadence {
    fn default() -> Self {
        Self {
            fast: Duration::from_secs(5),
            slow: Duration::from_secs(10),
            logs: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    /// After this many consecutive failed fetches a stale `Success` is
    /// demoted to `Error`. `None` keeps showing stale data indefinitely,
    /// matching the classic dashboard behavior.
    pub stale_after_failures: Option<u32>,
}

impl PollConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stale_after_failures: None,
        }
    }
}

/// One live screen subscription: fetch, publish, wait, repeat. The fetch
/// future and the inter-poll delay are the only suspension points, so exactly
/// one fetch is in flight at a time and slow calls never stack up.
///
/// State transitions: `Loading` until the first fetch completes; first
/// failure goes to `Error`; a failure after a prior success keeps the stale
/// `Success` published; any success goes to `Success`. Dropping the session
/// aborts the task, cancelling an in-flight fetch; nothing is published
/// after teardown.
pub struct PollSession<T> {
    rx: watch::Receiver<PollState<T>>,
    task: JoinHandle<()>,
}

impl<T> PollSession<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn spawn<F, Fut>(config: PollConfig, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(PollState::Loading);
        let task = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            loop {
                match fetch().await {
                    Ok(data) => {
                        consecutive_failures = 0;
                        let _ = tx.send(PollState::Success(data));
                    }
                    Err(error) => {
                        consecutive_failures += 1;
                        let message = compact_error(&error);
                        let demote = config
                            .stale_after_failures
                            .is_some_and(|limit| consecutive_failures >= limit);
                        if demote || !matches!(&*tx.borrow(), PollState::Success(_)) {
                            let _ = tx.send(PollState::Error(message));
                        } else {
                            debug!("poll fetch failed, keeping stale data: {message}");
                        }
                    }
                }
                tokio::time::sleep(config.interval).await;
            }
        });

        Self { rx, task }
    }

    /// Latest published state.
    pub fn state(&self) -> PollState<T> {
        self.rx.borrow().clone()
    }

    /// Independent receiver for observers (selection reconcilers, history
    /// trackers). The receiver reports closed once the session is torn down.
    pub fn subscribe(&self) -> watch::Receiver<PollState<T>> {
        self.rx.clone()
    }

    /// Waits for the next published state change. Returns `false` once the
    /// session has been torn down.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

impl<T> Drop for PollSession<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A followed log stream. Arriving lines accumulate into one text value
/// published as `PollState<String>`, so the presentation layer renders it the
/// same way as a polled feed. Dropping the handle aborts the reader task,
/// which closes the underlying stream.
pub struct LogStream {
    rx: watch::Receiver<PollState<String>>,
    task: JoinHandle<()>,
}

impl LogStream {
    pub fn spawn(mut lines: BoxStream<'static, anyhow::Result<String>>) -> Self {
        let (tx, rx) = watch::channel(PollState::Loading);
        let task = tokio::spawn(async move {
            let mut text = String::new();
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(&line);
                        let _ = tx.send(PollState::Success(text.clone()));
                    }
                    Err(error) => {
                        let message = compact_error(&error);
                        if matches!(&*tx.borrow(), PollState::Loading) {
                            let _ = tx.send(PollState::Error(message));
                        } else {
                            debug!("log stream ended: {message}");
                        }
                        break;
                    }
                }
            }
        });

        Self { rx, task }
    }

    pub fn state(&self) -> PollState<String> {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState<String>> {
        self.rx.clone()
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Flattens an error chain to the first cause plus up to two nested causes,
/// for single-line display in the UI.
pub fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{LogStream, PollConfig, PollSession, compact_error};
    use crate::model::PollState;
    use anyhow::{Context, anyhow};
    use futures::StreamExt;
    use futures::stream;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_session(
        outcomes: &'static [Result<u32, &'static str>],
        config: PollConfig,
    ) -> (PollSession<u32>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_fetch = calls.clone();
        let session = PollSession::spawn(config, move || {
            let call = calls_in_fetch.fetch_add(1, Ordering::SeqCst);
            let outcome = outcomes[call.min(outcomes.len() - 1)];
            async move {
                match outcome {
                    Ok(value) => Ok(value),
                    Err(message) => Err(anyhow!("{message}")),
                }
            }
        });
        (session, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn starts_loading_then_first_success() {
        let (mut session, _) = counting_session(
            &[Ok(1)],
            PollConfig::new(Duration::from_secs(5)),
        );
        assert!(session.state().is_loading());

        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Success(1));
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_from_loading_is_error() {
        let (mut session, _) = counting_session(
            &[Err("connection refused")],
            PollConfig::new(Duration::from_secs(5)),
        );

        assert!(session.changed().await);
        assert_eq!(
            session.state(),
            PollState::Error("connection refused".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failure_after_success_keeps_stale_data() {
        let (mut session, calls) = counting_session(
            &[Ok(7), Err("timeout"), Ok(9)],
            PollConfig::new(Duration::from_secs(5)),
        );

        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Success(7));

        // The failing second fetch publishes nothing; wait for the third.
        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Success(9));
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_recovers_to_success() {
        let (mut session, _) = counting_session(
            &[Err("boom"), Ok(3)],
            PollConfig::new(Duration::from_secs(5)),
        );

        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Error("boom".to_string()));

        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Success(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_limit_demotes_to_error() {
        let config = PollConfig {
            interval: Duration::from_secs(5),
            stale_after_failures: Some(2),
        };
        let (mut session, _) = counting_session(&[Ok(1), Err("down"), Err("down")], config);

        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Success(1));

        // First failure keeps the stale success, second crosses the limit.
        assert!(session.changed().await);
        assert_eq!(session.state(), PollState::Error("down".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_fetching() {
        let (mut session, calls) = counting_session(
            &[Ok(1)],
            PollConfig::new(Duration::from_secs(5)),
        );
        assert!(session.changed().await);

        let mut observer = session.subscribe();
        drop(session);
        // Receiver closes instead of delivering another update.
        assert!(observer.changed().await.is_err());

        let calls_at_teardown = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_teardown);
    }

    #[tokio::test(start_paused = true)]
    async fn no_overlapping_fetches() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let in_flight_fetch = in_flight.clone();
        let peak_fetch = peak.clone();
        let session = PollSession::spawn(
            PollConfig::new(Duration::from_millis(10)),
            move || {
                let in_flight = in_flight_fetch.clone();
                let peak = peak_fetch.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Slower than the poll interval.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(0u32)
                }
            },
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(session);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn log_stream_accumulates_lines() {
        let lines = stream::iter(vec![Ok("one".to_string()), Ok("two".to_string())]).boxed();
        let stream = LogStream::spawn(lines);
        let mut rx = stream.subscribe();

        while rx.changed().await.is_ok() {}
        assert_eq!(
            *rx.borrow(),
            PollState::Success("one\ntwo".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_log_stream_closes_the_reader() {
        let lines = stream::iter(vec![Ok("tail".to_string())])
            .chain(stream::pending())
            .boxed();
        let stream = LogStream::spawn(lines);
        let mut observer = stream.subscribe();

        assert!(observer.changed().await.is_ok());
        assert_eq!(stream.state(), PollState::Success("tail".to_string()));

        drop(stream);
        assert!(observer.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn log_stream_error_before_any_line_is_error() {
        let lines = stream::iter(vec![Err(anyhow!("pod is gone"))]).boxed();
        let stream = LogStream::spawn(lines);
        let mut rx = stream.subscribe();

        assert!(rx.changed().await.is_ok());
        assert_eq!(*rx.borrow(), PollState::Error("pod is gone".to_string()));
    }

    #[test]
    fn compact_error_flattens_chain() {
        let error = anyhow!("socket closed")
            .context("list pods failed")
            .context("refresh failed");
        assert_eq!(
            compact_error(&error),
            "refresh failed\ncaused by: list pods failed\ncaused by: socket closed"
        );
    }
}
