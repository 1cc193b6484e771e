//! Change-driven notifications for quotes, invoices and messages.
//!
//! `watch` holds the per-collection diff rules; `engine` runs them against
//! live snapshot feeds.

pub mod engine;
pub mod watch;

pub use engine::NotificationEngine;
pub use watch::{
    CollectionWatch, EvalContext, Invoices, MessageWatermark, Messages, Quotes, StatusWatermark,
    WatchedCollection,
};
