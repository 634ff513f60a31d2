//! Outbox dispatcher worker.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use tuma_engine::SettlementService;
use tuma_store::SqliteStore;
use tuma_types::{OutboxEvent, OutboxStatus, TransactionId};

/// Polls the outbox and delivers pending events to the settlement
/// worker's endpoint.
///
/// Delivery of an `*.initiated` event is what moves a transaction from
/// CREATED to PENDING_EXTERNAL - after that point, only the
/// asynchronous confirmation path touches it.
pub struct OutboxDispatcher {
    store: Arc<SqliteStore>,
    settlement: Arc<SettlementService>,
    client: reqwest::Client,
    target_url: String,
    poll_interval: Duration,
}

impl OutboxDispatcher {
    pub fn new(
        store: Arc<SqliteStore>,
        settlement: Arc<SettlementService>,
        target_url: String,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            settlement,
            client: reqwest::Client::new(),
            target_url,
            poll_interval,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(self) {
        info!("Starting outbox dispatcher sending to {}", self.target_url);
        loop {
            match self.store.pending_events(10).await {
                Ok(events) => {
                    if !events.is_empty() {
                        info!("Dispatching {} pending events", events.len());
                        for event in events {
                            self.process_event(event).await;
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to fetch pending events: {}", e);
                }
            }
            sleep(self.poll_interval).await;
        }
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, topic = %event.topic))]
    async fn process_event(&self, event: OutboxEvent) {
        let body = serde_json::json!({
            "topic": event.topic,
            "payload": event.payload,
        });
        let result = self.client.post(&self.target_url).json(&body).send().await;

        let (status, last_error) = match result {
            Ok(resp) if resp.status().is_success() => (OutboxStatus::Dispatched, None),
            Ok(resp) => (
                OutboxStatus::Failed,
                Some(format!("HTTP {}", resp.status())),
            ),
            Err(e) => (OutboxStatus::Failed, Some(e.to_string())),
        };

        if status == OutboxStatus::Dispatched && event.topic.ends_with(".initiated") {
            self.advance_transaction(&event).await;
        }

        if let Err(e) = self
            .store
            .mark_event_status(event.id, status, last_error)
            .await
        {
            error!("Failed to update outbox status: {}", e);
        }
    }

    /// The worker now holds the initiated event; the transaction is
    /// pending on the external transfer.
    async fn advance_transaction(&self, event: &OutboxEvent) {
        let id = event
            .payload
            .get("transaction_id")
            .and_then(|v| v.as_str())
            .and_then(|s| TransactionId::from_str(s).ok());
        match id {
            Some(id) => {
                if let Err(e) = self.settlement.mark_external_dispatched(id).await {
                    warn!("Could not advance transaction {}: {}", id, e);
                }
            }
            None => warn!("Initiated event without a parseable transaction_id"),
        }
    }
}
