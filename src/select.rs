use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::{
    DeploymentView, EventView, GenericResourceView, NodeView, PodView, PollState, ServiceView,
};

/// List rows addressable by Kubernetes object uid. Selection is tracked by
/// uid rather than list index so rows can move or disappear between polls
/// without the highlight jumping to an unrelated object.
pub trait Identified {
    fn uid(&self) -> &str;
}

macro_rules! identified {
    ($($view:ty),+ $(,)?) => {
        $(impl Identified for $view {
            fn uid(&self) -> &str {
                &self.uid
            }
        })+
    };
}

identified!(
    PodView,
    DeploymentView,
    ServiceView,
    NodeView,
    EventView,
    GenericResourceView,
);

/// Shared selection for one list screen. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct SelectionSlot {
    inner: Arc<Mutex<Option<String>>>,
}

impl SelectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, uid: impl Into<String>) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(uid.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = None;
        }
    }

    pub fn selected(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Drops the selection if the selected object is no longer in the list.
/// A still-present uid is left alone.
pub fn reconcile<T: Identified>(slot: &SelectionSlot, items: &[T]) {
    let Some(current) = slot.selected() else {
        return;
    };
    if !items.iter().any(|item| item.uid() == current) {
        slot.clear();
    }
}

/// Keeps a selection consistent with a polled list: every successful poll
/// result is reconciled against the slot. The task exits when the poll
/// session backing the receiver is torn down.
pub fn spawn_reconciler<T>(
    mut rx: watch::Receiver<PollState<Vec<T>>>,
    slot: SelectionSlot,
) -> JoinHandle<()>
where
    T: Identified + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            {
                let state = rx.borrow_and_update();
                if let PollState::Success(items) = &*state {
                    reconcile(&slot, items);
                }
            }
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}
