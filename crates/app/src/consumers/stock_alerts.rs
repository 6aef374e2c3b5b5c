//! Low-stock alerting over product events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::VariantId;
use domain::catalog::ProductEvent;
use outbox::{ConsumerError, EventConsumer, OutboxMessage};
use tokio::sync::RwLock;
use uuid::Uuid;

/// An open low-stock alert for one variant.
#[derive(Debug, Clone)]
pub struct StockAlert {
    pub product_id: Uuid,
    pub variant_id: VariantId,
    pub sku: String,
    pub available: u32,
    pub raised_at: DateTime<Utc>,
}

/// Raises an alert when a variant's available stock drops to the threshold
/// or below, and clears it once stock recovers.
///
/// State is keyed by variant, so redelivered messages settle on the same
/// answer.
#[derive(Clone)]
pub struct StockAlerts {
    threshold: u32,
    alerts: Arc<RwLock<HashMap<VariantId, StockAlert>>>,
}

impl StockAlerts {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            alerts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn active(&self) -> Vec<StockAlert> {
        self.alerts.read().await.values().cloned().collect()
    }

    pub async fn alert_for(&self, variant_id: VariantId) -> Option<StockAlert> {
        self.alerts.read().await.get(&variant_id).cloned()
    }

    /// The variant and availability carried by a stock event, if any.
    fn stock_level(event: &ProductEvent) -> Option<(VariantId, &str, u32)> {
        match event {
            ProductEvent::StockAdjusted {
                variant_id,
                sku,
                available,
                ..
            }
            | ProductEvent::StockReserved {
                variant_id,
                sku,
                available,
                ..
            }
            | ProductEvent::StockReleased {
                variant_id,
                sku,
                available,
                ..
            }
            | ProductEvent::StockCommitted {
                variant_id,
                sku,
                available,
                ..
            } => Some((*variant_id, sku, *available)),
            _ => None,
        }
    }
}

#[async_trait]
impl EventConsumer for StockAlerts {
    fn name(&self) -> &'static str {
        "stock-alerts"
    }

    fn interested_in(&self, message: &OutboxMessage) -> bool {
        message.aggregate_type == "product"
    }

    async fn handle(&self, message: &OutboxMessage) -> Result<(), ConsumerError> {
        let event: ProductEvent = serde_json::from_value(message.payload.clone())
            .map_err(|err| ConsumerError(format!("malformed product event: {err}")))?;

        let Some((variant_id, sku, available)) = Self::stock_level(&event) else {
            return Ok(());
        };

        let mut alerts = self.alerts.write().await;
        if available <= self.threshold {
            tracing::warn!(%variant_id, sku, available, "stock low");
            alerts
                .entry(variant_id)
                .and_modify(|alert| alert.available = available)
                .or_insert_with(|| StockAlert {
                    product_id: message.aggregate_id,
                    variant_id,
                    sku: sku.to_string(),
                    available,
                    raised_at: message.occurred_at,
                });
        } else {
            alerts.remove(&variant_id);
        }
        Ok(())
    }
}
