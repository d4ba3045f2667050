mod smtp;
mod templates;

pub use smtp::SmtpNotifier;
pub use templates::EmailTemplate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Score events that trigger notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationKind {
    ThresholdCrossed {
        ticker: String,
        score: f64,
        threshold: f64,
        direction: String,
    },
    ScoreDropped {
        ticker: String,
        previous: f64,
        current: f64,
        change_pct: f64,
    },
    ScoreRose {
        ticker: String,
        previous: f64,
        current: f64,
        change_pct: f64,
    },
}

/// A notification to be dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            timestamp: chrono::Utc::now(),
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Which alert channel flag a notifier serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Email,
    Push,
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
    fn kind(&self) -> ChannelKind;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Push webhook error: {0}")]
    Push(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_to: Vec<String>,
    pub smtp_tls: SmtpTls,
    pub push_webhook_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub enum SmtpTls {
    #[default]
    StartTls,
    Tls,
    None,
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let smtp_to = std::env::var("NOTIFICATION_EMAIL_TO")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let smtp_tls = match std::env::var("SMTP_TLS").unwrap_or_default().as_str() {
            "tls" => SmtpTls::Tls,
            "none" => SmtpTls::None,
            _ => SmtpTls::StartTls,
        };

        Self {
            smtp_host: std::env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(587),
            smtp_username: std::env::var("SMTP_USERNAME")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_password: std::env::var("SMTP_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_from: std::env::var("SMTP_FROM_ADDRESS")
                .ok()
                .filter(|s| !s.is_empty()),
            smtp_to,
            smtp_tls,
            push_webhook_url: std::env::var("PUSH_WEBHOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Dispatches notifications to the channels an alert opted into.
pub struct NotificationService {
    channels: std::sync::Arc<Vec<Box<dyn NotificationChannel>>>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if config.smtp_host.is_some() && config.smtp_from.is_some() && !config.smtp_to.is_empty() {
            match SmtpNotifier::new(config) {
                Ok(notifier) => {
                    tracing::info!(
                        "Email notifications enabled (SMTP -> {} recipients)",
                        config.smtp_to.len()
                    );
                    channels.push(Box::new(notifier));
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP notifier: {}", e);
                }
            }
        }

        if let Some(ref webhook_url) = config.push_webhook_url {
            channels.push(Box::new(PushWebhookNotifier {
                webhook_url: webhook_url.clone(),
                client: reqwest::Client::new(),
            }));
            tracing::info!("Push webhook notifications enabled");
        }

        if channels.is_empty() {
            tracing::info!(
                "No notification channels configured (set SMTP_HOST or PUSH_WEBHOOK_URL)"
            );
        }

        Self {
            channels: std::sync::Arc::new(channels),
        }
    }

    /// Send to the opted-in channels, awaiting completion. Channel failures
    /// are logged; they never propagate to the caller.
    pub async fn dispatch(&self, notification: &Notification, email: bool, push: bool) {
        for channel in self.channels.iter() {
            let wanted = match channel.kind() {
                ChannelKind::Email => email,
                ChannelKind::Push => push,
            };
            if !wanted {
                continue;
            }
            match channel.send(notification).await {
                Ok(()) => tracing::debug!("Sent notification via {}", channel.name()),
                Err(e) => {
                    tracing::warn!("Failed to send notification via {}: {}", channel.name(), e)
                }
            }
        }
    }

    /// Fire-and-forget dispatch via tokio::spawn.
    pub fn dispatch_detached(&self, notification: Notification, email: bool, push: bool) {
        let channels = self.channels.clone();
        tokio::spawn(async move {
            for channel in channels.iter() {
                let wanted = match channel.kind() {
                    ChannelKind::Email => email,
                    ChannelKind::Push => push,
                };
                if !wanted {
                    continue;
                }
                match channel.send(&notification).await {
                    Ok(()) => tracing::debug!("Sent notification via {}", channel.name()),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to send notification via {}: {}",
                            channel.name(),
                            e
                        )
                    }
                }
            }
        });
    }
}

/// Push delivery via a configured webhook gateway.
struct PushWebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

#[async_trait]
impl NotificationChannel for PushWebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "title": notification.title,
            "body": notification.message,
            "timestamp": notification.timestamp.to_rfc3339(),
            "event": notification.kind,
        });

        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Push(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "push-webhook"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }
}
