use crate::config::NotifierConfig;
use serde_json::json;

/// Best-effort event delivery to an external collaborator (webhook).
///
/// Every method swallows failures after logging them: notifications must
/// never roll back or delay the transaction that triggered them.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.webhook_url,
        }
    }

    pub async fn tickets_issued(&self, owner_id: i64, issued: usize) {
        self.send(json!({
            "event": "tickets_issued",
            "owner_id": owner_id,
            "issued": issued,
        }))
        .await;
    }

    pub async fn winner_selected(
        &self,
        raffle_id: i64,
        winner_user_id: i64,
        winner_ticket_uuid: uuid::Uuid,
    ) {
        self.send(json!({
            "event": "winner_selected",
            "raffle_id": raffle_id,
            "winner_user_id": winner_user_id,
            "winner_ticket_uuid": winner_ticket_uuid,
        }))
        .await;
    }

    pub async fn raffle_lost(&self, raffle_id: i64, user_id: i64) {
        self.send(json!({
            "event": "raffle_lost",
            "raffle_id": raffle_id,
            "user_id": user_id,
        }))
        .await;
    }

    pub async fn raffle_expired(&self, raffle_id: i64) {
        self.send(json!({
            "event": "raffle_expired_without_winner",
            "raffle_id": raffle_id,
        }))
        .await;
    }

    async fn send(&self, payload: serde_json::Value) {
        let Some(url) = &self.webhook_url else {
            log::debug!("Notifier disabled, dropping event: {payload}");
            return;
        };
        if let Err(e) = self.client.post(url).json(&payload).send().await {
            log::warn!("Failed to deliver notification event: {e}");
        }
    }
}
