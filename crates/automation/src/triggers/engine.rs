//! Spawns one evaluation task per watched collection.

use std::sync::Arc;
use std::time::Duration;

use fieldops_core::{Invoice, Message, Quote};
use tokio::sync::mpsc;

use super::watch::{CollectionWatch, EvalContext, Invoices, Messages, Quotes, WatchedCollection};
use crate::config::AutomationConfig;
use crate::handle::WatchHandle;
use crate::ports::NotificationSink;

/// Turns remote collection snapshots into local notifications.
///
/// Each `watch_*` call starts an independent subscription with its own
/// watermark and warm-up window. Snapshots of one collection are evaluated
/// one at a time, in arrival order, by the task that owns the watermark.
pub struct NotificationEngine {
    sink: Arc<dyn NotificationSink>,
    warmup: Duration,
    ctx: EvalContext,
}

impl NotificationEngine {
    pub fn new(sink: Arc<dyn NotificationSink>, config: &AutomationConfig) -> Self {
        Self {
            sink,
            warmup: config.warmup(),
            ctx: EvalContext::from(config),
        }
    }

    pub fn watch_quotes(&self, snapshots: mpsc::Receiver<Vec<Quote>>) -> WatchHandle {
        self.watch::<Quotes>(snapshots)
    }

    pub fn watch_invoices(&self, snapshots: mpsc::Receiver<Vec<Invoice>>) -> WatchHandle {
        self.watch::<Invoices>(snapshots)
    }

    pub fn watch_messages(&self, snapshots: mpsc::Receiver<Vec<Message>>) -> WatchHandle {
        self.watch::<Messages>(snapshots)
    }

    /// Watch any collection the engine knows how to diff.
    pub fn watch<C>(&self, mut snapshots: mpsc::Receiver<Vec<C::Item>>) -> WatchHandle
    where
        C: WatchedCollection + 'static,
        C::Item: Send + 'static,
        C::Watermark: Send + 'static,
    {
        // Warm-up counts from subscription start, not from the first snapshot.
        let mut watch = CollectionWatch::<C>::new(self.warmup, self.ctx);
        let sink = Arc::clone(&self.sink);
        tracing::info!(collection = C::NAME, warmup_secs = self.warmup.as_secs(), "Change watch started");

        WatchHandle::spawn(C::NAME, move |token| async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    snapshot = snapshots.recv() => match snapshot {
                        Some(snapshot) => {
                            for notification in watch.observe(&snapshot) {
                                tracing::info!(
                                    collection = C::NAME,
                                    kind = notification.kind.as_str(),
                                    "Change notification"
                                );
                                metrics::counter!("fieldops_notifications_total", "kind" => notification.kind.as_str())
                                    .increment(1);
                                sink.show(notification);
                            }
                        }
                        None => break,
                    },
                }
            }
            tracing::info!(collection = C::NAME, "Change watch stopped");
        })
    }
}
