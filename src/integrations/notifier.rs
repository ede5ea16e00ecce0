use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::time::Duration;

const TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub user_id: i64,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AssignmentOffer,
    AssignmentConfirmed,
    ConfirmationReminder,
    GameDayReminder,
    GameCancelled,
    PaymentSent,
    ReviewRequest,
    AdminAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AssignmentOffer => "assignment_offer",
            NotificationKind::AssignmentConfirmed => "assignment_confirmed",
            NotificationKind::ConfirmationReminder => "confirmation_reminder",
            NotificationKind::GameDayReminder => "game_day_reminder",
            NotificationKind::GameCancelled => "game_cancelled",
            NotificationKind::PaymentSent => "payment_sent",
            NotificationKind::ReviewRequest => "review_request",
            NotificationKind::AdminAlert => "admin_alert",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub recipient: Recipient,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub context: serde_json::Value,
}

/// Delivery boundary. Failures are reported to the caller, which logs them;
/// they never roll back the state transition that produced the message.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &NotificationMessage) -> Result<()>;
}

/// Default channel: writes each message to the application log. Used by the
/// CLI commands and whenever no webhook endpoint is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &NotificationMessage) -> Result<()> {
        info!(
            "Notification [{}] for {}: {}",
            message.kind.as_str(),
            message.recipient.email,
            message.context
        );
        Ok(())
    }
}

/// Posts each message as JSON to a configured endpoint. Constructed only
/// under the server runtime; delivery rides a spawned task so the calling
/// transition never waits on the wire.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .context("Failed to build webhook HTTP client")?;

        Ok(Self { client, url })
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, message: &NotificationMessage) -> Result<()> {
        let payload =
            serde_json::to_value(message).context("Failed to serialize notification")?;
        let client = self.client.clone();
        let url = self.url.clone();
        let kind = message.kind.as_str();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .json(&payload)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            if let Err(err) = result {
                warn!("Webhook delivery of {} failed: {err:#}", kind);
            }
        });

        Ok(())
    }
}
