//! Built-in outbox consumers.
//!
//! Both keep their state in memory behind the same handle the rest of the
//! process reads from. Handlers are idempotent because delivery is
//! at-least-once.

mod activity_feed;
mod stock_alerts;

pub use activity_feed::{ActivityEntry, ActivityFeed};
pub use stock_alerts::{StockAlert, StockAlerts};
