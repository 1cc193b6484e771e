//! Per-collection change detection.
//!
//! A [`CollectionWatch`] owns the watermark for one watched collection. Each
//! snapshot is compared with the watermark, the watermark is replaced by the
//! snapshot, and alerts are returned once the warm-up window has passed.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use fieldops_core::{Invoice, InvoiceStatus, Message, Quote, QuoteStatus};
use tokio::time::Instant;

use crate::config::AutomationConfig;
use crate::notification::Notification;

/// Settings shared by every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalContext {
    pub preview_max_chars: usize,
}

impl From<&AutomationConfig> for EvalContext {
    fn from(config: &AutomationConfig) -> Self {
        Self {
            preview_max_chars: config.preview_max_chars,
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::from(&AutomationConfig::default())
    }
}

/// A kind of remote collection the engine knows how to diff.
pub trait WatchedCollection {
    type Item;
    type Watermark: Default;

    /// Label for logs and metrics.
    const NAME: &'static str;

    /// Compare `snapshot` with `watermark`, replace the watermark, and return
    /// the alerts the change warrants.
    fn evaluate(watermark: &mut Self::Watermark, snapshot: &[Self::Item], ctx: &EvalContext) -> Vec<Notification>;
}

/// Last-seen status per entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWatermark<S> {
    statuses: HashMap<String, S>,
}

impl<S> Default for StatusWatermark<S> {
    fn default() -> Self {
        Self {
            statuses: HashMap::new(),
        }
    }
}

impl<S: Copy> StatusWatermark<S> {
    pub fn status_of(&self, id: &str) -> Option<S> {
        self.statuses.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Inbound message count from the previous snapshot. `None` until the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageWatermark {
    pub inbound_count: Option<usize>,
}

/// Entities whose status transitions may raise an alert.
trait StatusTracked {
    type Status: Copy + Eq + Hash;

    fn id(&self) -> &str;
    fn status(&self) -> Self::Status;
    fn alert(&self) -> Option<Notification>;
}

impl StatusTracked for Quote {
    type Status = QuoteStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> QuoteStatus {
        self.status
    }

    fn alert(&self) -> Option<Notification> {
        Notification::for_quote(self)
    }
}

impl StatusTracked for Invoice {
    type Status = InvoiceStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> InvoiceStatus {
        self.status
    }

    fn alert(&self) -> Option<Notification> {
        Notification::for_invoice(self)
    }
}

/// Alerts only for entities already in the watermark whose status changed.
fn evaluate_statuses<T: StatusTracked>(watermark: &mut StatusWatermark<T::Status>, snapshot: &[T]) -> Vec<Notification> {
    let mut alerts = Vec::new();
    let mut next = HashMap::with_capacity(snapshot.len());
    for item in snapshot {
        let status = item.status();
        if let Some(previous) = watermark.statuses.get(item.id()) {
            if *previous != status {
                alerts.extend(item.alert());
            }
        }
        next.insert(item.id().to_string(), status);
    }
    watermark.statuses = next;
    alerts
}

pub enum Quotes {}

impl WatchedCollection for Quotes {
    type Item = Quote;
    type Watermark = StatusWatermark<QuoteStatus>;
    const NAME: &'static str = "quotes";

    fn evaluate(watermark: &mut Self::Watermark, snapshot: &[Quote], _ctx: &EvalContext) -> Vec<Notification> {
        evaluate_statuses(watermark, snapshot)
    }
}

pub enum Invoices {}

impl WatchedCollection for Invoices {
    type Item = Invoice;
    type Watermark = StatusWatermark<InvoiceStatus>;
    const NAME: &'static str = "invoices";

    fn evaluate(watermark: &mut Self::Watermark, snapshot: &[Invoice], _ctx: &EvalContext) -> Vec<Notification> {
        evaluate_statuses(watermark, snapshot)
    }
}

pub enum Messages {}

impl WatchedCollection for Messages {
    type Item = Message;
    type Watermark = MessageWatermark;
    const NAME: &'static str = "messages";

    fn evaluate(watermark: &mut MessageWatermark, snapshot: &[Message], ctx: &EvalContext) -> Vec<Notification> {
        let inbound: Vec<&Message> = snapshot.iter().filter(|m| m.is_inbound()).collect();
        let count = inbound.len();
        let previous = watermark.inbound_count.replace(count);

        let grew = previous.is_some_and(|p| count > p);
        if !grew {
            return Vec::new();
        }

        // Newest by send time; it may have been read elsewhere already.
        match inbound.into_iter().max_by_key(|m| m.sent_at) {
            Some(newest) if !newest.read => vec![Notification::new_message(newest, ctx.preview_max_chars)],
            _ => Vec::new(),
        }
    }
}

// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Watermark plus warm-up window for one collection.
///
/// Create a fresh watch whenever the underlying subscription restarts.
pub struct CollectionWatch<C: WatchedCollection> {
    watermark: C::Watermark,
    warm_until: Instant,
    ctx: EvalContext,
    _collection: PhantomData<fn() -> C>,
}

impl<C: WatchedCollection> CollectionWatch<C> {
    /// Start watching now; alerts are suppressed for `warmup`.
    pub fn new(warmup: Duration, ctx: EvalContext) -> Self {
        Self::starting_at(Instant::now(), warmup, ctx)
    }

    /// A warm-up too long to represent as an `Instant` never ends.
    pub fn starting_at(started: Instant, warmup: Duration, ctx: EvalContext) -> Self {
        let warm_until = started.checked_add(warmup).unwrap_or_else(|| {
            tracing::warn!(collection = C::NAME, warmup_secs = warmup.as_secs(), "Warm-up out of range; alerts stay muted");
            started.checked_add(FAR_FUTURE).unwrap_or(started)
        });
        Self {
            watermark: C::Watermark::default(),
            warm_until,
            ctx,
            _collection: PhantomData,
        }
    }

    pub fn observe(&mut self, snapshot: &[C::Item]) -> Vec<Notification> {
        self.observe_at(snapshot, Instant::now())
    }

    /// Evaluate `snapshot` as of `now`. The watermark always advances; alerts
    /// found during warm-up are dropped.
    pub fn observe_at(&mut self, snapshot: &[C::Item], now: Instant) -> Vec<Notification> {
        let alerts = C::evaluate(&mut self.watermark, snapshot, &self.ctx);
        if now < self.warm_until {
            if !alerts.is_empty() {
                tracing::debug!(collection = C::NAME, suppressed = alerts.len(), "Alerts suppressed during warm-up");
            }
            return Vec::new();
        }
        alerts
    }

    pub fn is_warming_up_at(&self, now: Instant) -> bool {
        now < self.warm_until
    }

    pub fn watermark(&self) -> &C::Watermark {
        &self.watermark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use chrono::{TimeZone, Utc};
    use fieldops_core::MessageDirection;
    use pretty_assertions::assert_eq;

    const WARMUP: Duration = Duration::from_secs(3);

    fn quote(id: &str, status: QuoteStatus) -> Quote {
        Quote {
            id: id.into(),
            number: None,
            client_name: None,
            status,
        }
    }

    fn invoice(id: &str, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: id.into(),
            number: None,
            client_name: None,
            status,
        }
    }

    fn message(id: &str, direction: MessageDirection, minute: u32, read: bool) -> Message {
        Message {
            id: id.into(),
            direction,
            body: format!("body {id}"),
            read,
            sent_at: Utc.with_ymd_and_hms(2026, 10, 18, 12, minute, 0).unwrap(),
            sender_name: None,
        }
    }

    fn kinds(alerts: &[Notification]) -> Vec<NotificationKind> {
        alerts.iter().map(|n| n.kind).collect()
    }

    /// A watch whose warm-up already ended, plus the instant to observe at.
    fn warm<C: WatchedCollection>() -> (CollectionWatch<C>, Instant) {
        let started = Instant::now();
        (CollectionWatch::starting_at(started, WARMUP, EvalContext::default()), started + WARMUP)
    }

    #[test]
    fn quote_draft_to_approved_alerts_once() {
        let (mut watch, now) = warm::<Quotes>();
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Draft)], now).is_empty());

        let alerts = watch.observe_at(&[quote("q", QuoteStatus::Approved)], now);
        assert_eq!(kinds(&alerts), vec![NotificationKind::QuoteApproved]);
        assert_eq!(alerts[0].title, "Quote Approved");

        // Approved -> Approved is not a transition.
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Approved)], now).is_empty());
    }

    #[test]
    fn quote_changes_requested_and_silent_transitions() {
        let (mut watch, now) = warm::<Quotes>();
        watch.observe_at(&[quote("a", QuoteStatus::Draft), quote("b", QuoteStatus::Draft)], now);
        let alerts = watch.observe_at(
            &[quote("a", QuoteStatus::ChangesRequested), quote("b", QuoteStatus::AwaitingResponse)],
            now,
        );
        assert_eq!(kinds(&alerts), vec![NotificationKind::QuoteChangesRequested]);
    }

    #[test]
    fn transitions_during_warmup_are_suppressed_but_recorded() {
        let started = Instant::now();
        let mut watch = CollectionWatch::<Quotes>::starting_at(started, WARMUP, EvalContext::default());
        let early = started + Duration::from_secs(1);

        assert!(watch.is_warming_up_at(early));
        watch.observe_at(&[quote("q", QuoteStatus::Draft)], early);
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Approved)], early).is_empty());
        assert_eq!(watch.watermark().status_of("q"), Some(QuoteStatus::Approved));

        // The watermark already holds Approved, so nothing fires after warm-up either.
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Approved)], started + WARMUP).is_empty());
    }

    #[test]
    fn unrepresentable_warmup_mutes_instead_of_panicking() {
        let started = Instant::now();
        let mut watch = CollectionWatch::<Quotes>::starting_at(started, Duration::MAX, EvalContext::default());
        let much_later = started + Duration::from_secs(86400 * 365);

        assert!(watch.is_warming_up_at(much_later));
        watch.observe_at(&[quote("q", QuoteStatus::Draft)], much_later);
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Approved)], much_later).is_empty());
    }

    #[test]
    fn default_context_follows_config_default() {
        assert_eq!(
            EvalContext::default().preview_max_chars,
            AutomationConfig::default().preview_max_chars
        );
    }

    #[test]
    fn new_entities_do_not_alert() {
        let (mut watch, now) = warm::<Quotes>();
        watch.observe_at(&[], now);
        assert!(watch.observe_at(&[quote("fresh", QuoteStatus::Approved)], now).is_empty());
    }

    #[test]
    fn watermark_is_replaced_not_merged() {
        let (mut watch, now) = warm::<Quotes>();
        watch.observe_at(&[quote("q", QuoteStatus::Draft)], now);
        // q disappears from a snapshot, then comes back approved: no prior value.
        watch.observe_at(&[], now);
        assert!(watch.watermark().is_empty());
        assert!(watch.observe_at(&[quote("q", QuoteStatus::Approved)], now).is_empty());
    }

    #[test]
    fn invoice_paid_and_overdue() {
        let (mut watch, now) = warm::<Invoices>();
        watch.observe_at(
            &[
                invoice("1", InvoiceStatus::AwaitingPayment),
                invoice("2", InvoiceStatus::AwaitingPayment),
                invoice("3", InvoiceStatus::Draft),
            ],
            now,
        );
        let alerts = watch.observe_at(
            &[
                invoice("1", InvoiceStatus::Paid),
                invoice("2", InvoiceStatus::Overdue),
                invoice("3", InvoiceStatus::AwaitingPayment),
            ],
            now,
        );
        assert_eq!(
            kinds(&alerts),
            vec![NotificationKind::InvoicePaid, NotificationKind::InvoiceOverdue]
        );
    }

    #[test]
    fn new_inbound_message_alerts_with_preview() {
        let (mut watch, now) = warm::<Messages>();
        let first = message("1", MessageDirection::Inbound, 0, true);
        assert!(watch.observe_at(&[first.clone()], now).is_empty(), "baseline");

        let mut newest = message("2", MessageDirection::Inbound, 5, false);
        newest.body = "x".repeat(140);
        let alerts = watch.observe_at(&[first, newest], now);
        assert_eq!(kinds(&alerts), vec![NotificationKind::NewMessage]);
        assert_eq!(alerts[0].body.chars().count(), 100);
        assert_eq!(watch.watermark().inbound_count, Some(2));
    }

    #[test]
    fn read_or_outbound_messages_do_not_alert() {
        let (mut watch, now) = warm::<Messages>();
        let base = message("1", MessageDirection::Inbound, 0, false);
        watch.observe_at(&[base.clone()], now);

        // Outbound only: inbound count unchanged.
        let outbound = message("2", MessageDirection::Outbound, 1, false);
        assert!(watch.observe_at(&[base.clone(), outbound.clone()], now).is_empty());

        // New inbound that is already read.
        let read = message("3", MessageDirection::Inbound, 2, true);
        assert!(watch.observe_at(&[base, outbound, read], now).is_empty());
    }

    #[test]
    fn message_count_drop_then_rise_measures_against_previous() {
        let (mut watch, now) = warm::<Messages>();
        let a = message("a", MessageDirection::Inbound, 0, false);
        let b = message("b", MessageDirection::Inbound, 1, false);
        watch.observe_at(&[a.clone(), b.clone()], now);
        assert!(watch.observe_at(&[a.clone()], now).is_empty());
        assert_eq!(kinds(&watch.observe_at(&[a, b], now)), vec![NotificationKind::NewMessage]);
    }
}
