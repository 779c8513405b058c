//! Downstream consumer for match events.

use async_trait::async_trait;

use crate::core::events::{Event, EventHandler};

/// Logs every established match; the hand-off point where push
/// notifications and analytics hang off the bus.
pub struct MatchNotifier;

#[async_trait]
impl EventHandler for MatchNotifier {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let match_id = event
            .payload
            .get("matchId")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let profiles = event
            .payload
            .get("profiles")
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        tracing::info!(topic = %event.topic, match_id, %profiles, "notifying matched profiles");
        Ok(())
    }
}
