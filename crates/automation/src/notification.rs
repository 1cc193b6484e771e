//! Local notifications produced by the automation core.

use fieldops_core::{Invoice, InvoiceStatus, Job, Message, Quote, QuoteStatus};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Arrived,
    ClockOutReminder,
    QuoteApproved,
    QuoteChangesRequested,
    InvoicePaid,
    InvoiceOverdue,
    NewMessage,
}

impl NotificationKind {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Arrived => "arrived",
            NotificationKind::ClockOutReminder => "clock_out_reminder",
            NotificationKind::QuoteApproved => "quote_approved",
            NotificationKind::QuoteChangesRequested => "quote_changes_requested",
            NotificationKind::InvoicePaid => "invoice_paid",
            NotificationKind::InvoiceOverdue => "invoice_overdue",
            NotificationKind::NewMessage => "new_message",
        }
    }
}

/// A notification handed to the platform sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Routing data for the tap handler.
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn arrived(job: &Job) -> Self {
        Self {
            kind: NotificationKind::Arrived,
            title: format!("Arrived at {}", job.display_title()),
            body: "Tap to start your timer.".into(),
            payload: json!({ "type": "geofence_enter", "jobId": job.id }),
        }
    }

    pub fn clock_out_reminder(job: &Job) -> Self {
        Self {
            kind: NotificationKind::ClockOutReminder,
            title: format!("Leaving {}", job.display_title()),
            body: "Your timer is still running. Tap to clock out.".into(),
            payload: json!({ "type": "geofence_exit", "jobId": job.id }),
        }
    }

    /// Alert for a quote that just moved into `quote.status`, if that status is alert-worthy.
    pub fn for_quote(quote: &Quote) -> Option<Self> {
        let (kind, title, verb) = match quote.status {
            QuoteStatus::Approved => (NotificationKind::QuoteApproved, "Quote Approved", "was approved"),
            QuoteStatus::ChangesRequested => (
                NotificationKind::QuoteChangesRequested,
                "Quote Changes Requested",
                "needs changes",
            ),
            _ => return None,
        };
        Some(Self {
            kind,
            title: title.into(),
            body: describe("Quote", quote.number.as_deref(), quote.client_name.as_deref(), verb),
            payload: json!({ "type": "quote", "quoteId": quote.id }),
        })
    }

    /// Alert for an invoice that just moved into `invoice.status`, if alert-worthy.
    pub fn for_invoice(invoice: &Invoice) -> Option<Self> {
        let (kind, title, verb) = match invoice.status {
            InvoiceStatus::Paid => (NotificationKind::InvoicePaid, "Invoice Paid", "was paid"),
            InvoiceStatus::Overdue => (NotificationKind::InvoiceOverdue, "Invoice Overdue", "is overdue"),
            _ => return None,
        };
        Some(Self {
            kind,
            title: title.into(),
            body: describe("Invoice", invoice.number.as_deref(), invoice.client_name.as_deref(), verb),
            payload: json!({ "type": "invoice", "invoiceId": invoice.id }),
        })
    }

    pub fn new_message(message: &Message, preview_max_chars: usize) -> Self {
        let body = match message.sender_name.as_deref() {
            Some(name) if !name.trim().is_empty() => format!("{}: {}", name.trim(), message.body),
            _ => message.body.clone(),
        };
        Self {
            kind: NotificationKind::NewMessage,
            title: "New Message".into(),
            body: preview(&body, preview_max_chars),
            payload: json!({ "type": "message", "messageId": message.id }),
        }
    }
}

fn describe(noun: &str, number: Option<&str>, client: Option<&str>, verb: &str) -> String {
    let mut subject = match number {
        Some(n) => format!("{noun} #{n}"),
        None => noun.to_string(),
    };
    if let Some(client) = client.filter(|c| !c.trim().is_empty()) {
        subject.push_str(" for ");
        subject.push_str(client.trim());
    }
    format!("{subject} {verb}.")
}

/// Collapse whitespace and cut to at most `max_chars` characters, ending
/// with an ellipsis when cut.
pub fn preview(body: &str, max_chars: usize) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldops_core::{JobStatus, MessageDirection};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arrived_uses_job_title() {
        let job = Job::new("j-1", "Deck repair", JobStatus::Scheduled);
        let n = Notification::arrived(&job);
        assert_eq!(n.title, "Arrived at Deck repair");
        assert_eq!(n.payload["jobId"], "j-1");
    }

    #[test]
    fn test_quote_alerts() {
        let mut quote = Quote {
            id: "q-1".into(),
            number: Some("42".into()),
            client_name: Some("Acme".into()),
            status: QuoteStatus::Approved,
        };
        let n = Notification::for_quote(&quote).unwrap();
        assert_eq!(n.title, "Quote Approved");
        assert_eq!(n.body, "Quote #42 for Acme was approved.");

        quote.status = QuoteStatus::Draft;
        assert!(Notification::for_quote(&quote).is_none());
    }

    #[test]
    fn test_invoice_alerts() {
        let invoice = Invoice {
            id: "i-1".into(),
            number: None,
            client_name: None,
            status: InvoiceStatus::Overdue,
        };
        let n = Notification::for_invoice(&invoice).unwrap();
        assert_eq!(n.kind, NotificationKind::InvoiceOverdue);
        assert_eq!(n.body, "Invoice is overdue.");
    }

    #[test]
    fn test_preview_truncation() {
        assert_eq!(preview("  short\n text ", 100), "short text");
        let long = "a".repeat(150);
        let p = preview(&long, 100);
        assert_eq!(p.chars().count(), 100);
        assert!(p.ends_with('…'));
        // Multi-byte characters are cut on char boundaries.
        let p = preview(&"é".repeat(10), 5);
        assert_eq!(p, "éééé…");
    }

    #[test]
    fn test_new_message_sender_goes_in_body() {
        let mut message = Message {
            id: "m-1".into(),
            direction: MessageDirection::Inbound,
            body: "Gate code is 1234".into(),
            read: false,
            sent_at: chrono::Utc::now(),
            sender_name: Some("Dana".into()),
        };
        let n = Notification::new_message(&message, 100);
        assert_eq!(n.title, "New Message");
        assert_eq!(n.body, "Dana: Gate code is 1234");

        message.sender_name = None;
        let n = Notification::new_message(&message, 100);
        assert_eq!(n.title, "New Message");
        assert_eq!(n.body, "Gate code is 1234");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(NotificationKind::QuoteChangesRequested.as_str(), "quote_changes_requested");
        assert_eq!(serde_json::to_value(NotificationKind::NewMessage).unwrap(), "new_message");
    }
}
