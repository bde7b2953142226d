//! Report completion notifications
//!
//! Subscribers register for one report id and receive that report's final
//! status once. A subscription unregisters itself when dropped, so its
//! lifetime is the lifetime of whatever connection is waiting on it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::types::ReportStatus;

type Subscribers = HashMap<String, Vec<(u64, oneshot::Sender<ReportStatus>)>>;

#[derive(Default)]
struct Registry {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Push channel from report generation to waiting clients, keyed by report id
#[derive(Clone, Default)]
pub struct ReportNotifier {
    registry: Arc<Registry>,
}

impl ReportNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `report_id` to finish
    pub fn subscribe(&self, report_id: &str) -> ReportSubscription {
        let (tx, rx) = oneshot::channel();
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .entry(report_id.to_string())
            .or_default()
            .push((id, tx));

        ReportSubscription {
            id,
            report_id: report_id.to_string(),
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Deliver `status` to everyone waiting on `report_id`
    ///
    /// Returns how many live subscribers received it. Subscribers that went
    /// away without unregistering are discarded.
    pub fn publish(&self, report_id: &str, status: ReportStatus) -> usize {
        let waiting = self.registry.lock().remove(report_id).unwrap_or_default();
        let delivered = waiting
            .into_iter()
            .filter(|(_, tx)| !tx.is_closed())
            .filter_map(|(_, tx)| tx.send(status).ok())
            .count();
        debug!(report_id, ?status, delivered, "report status published");
        delivered
    }

    pub fn subscriber_count(&self, report_id: &str) -> usize {
        self.registry.lock().get(report_id).map_or(0, Vec::len)
    }
}

/// A pending wait on one report
pub struct ReportSubscription {
    id: u64,
    report_id: String,
    rx: oneshot::Receiver<ReportStatus>,
    registry: Arc<Registry>,
}

impl ReportSubscription {
    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    /// Resolve with the published status, or `None` if the notifier was dropped
    pub async fn wait(mut self) -> Option<ReportStatus> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for ReportSubscription {
    fn drop(&mut self) {
        let mut subscribers = self.registry.lock();
        if let Some(list) = subscribers.get_mut(&self.report_id) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                subscribers.remove(&self.report_id);
            }
        }
    }
}
