use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::templates::EmailTemplate;
use crate::{
    ChannelKind, Notification, NotificationChannel, NotificationConfig, NotificationError, SmtpTls,
};

/// Email channel over SMTP. Each notification goes out as a single message
/// addressed to every configured recipient.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

fn parse_mailbox(addr: &str, role: &str) -> Result<Mailbox, NotificationError> {
    addr.parse().map_err(|e| {
        NotificationError::Config(format!("Invalid {role} address '{addr}': {e}"))
    })
}

/// Parse the recipient list, dropping (and logging) bad entries. At least
/// one address must survive.
fn parse_recipients(addrs: &[String]) -> Result<Vec<Mailbox>, NotificationError> {
    let mut recipients = Vec::with_capacity(addrs.len());
    for addr in addrs {
        match parse_mailbox(addr, "recipient") {
            Ok(mailbox) => recipients.push(mailbox),
            Err(e) => tracing::warn!("Skipping bad email recipient: {}", e),
        }
    }

    if recipients.is_empty() {
        return Err(NotificationError::Config(
            "No valid NOTIFICATION_EMAIL_TO addresses".into(),
        ));
    }
    Ok(recipients)
}

impl SmtpNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let from_addr = config
            .smtp_from
            .as_deref()
            .ok_or_else(|| NotificationError::Config("SMTP_FROM_ADDRESS not set".into()))?;

        Ok(Self {
            transport: build_transport(config)?,
            from: parse_mailbox(from_addr, "from")?,
            recipients: parse_recipients(&config.smtp_to)?,
        })
    }
}

fn build_transport(
    config: &NotificationConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
    let host = config
        .smtp_host
        .as_deref()
        .ok_or_else(|| NotificationError::Config("SMTP_HOST not set".into()))?;

    let mut builder = match config.smtp_tls {
        SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| NotificationError::Smtp(format!("TLS relay to {host}: {e}")))?,
        SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotificationError::Smtp(format!("STARTTLS relay to {host}: {e}")))?,
        // Plaintext, for local relays and test setups only.
        SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
    }
    .port(config.smtp_port);

    if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
        builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    Ok(builder.build())
}

#[async_trait]
impl NotificationChannel for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut message = Message::builder()
            .from(self.from.clone())
            .subject(notification.title.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &self.recipients {
            message = message.to(recipient.clone());
        }

        let email = message
            .body(EmailTemplate::render(notification))
            .map_err(|e| NotificationError::Smtp(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotificationError::Smtp(format!("Failed to send email: {e}")))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_recipients_are_dropped_not_fatal() {
        let recipients = parse_recipients(&[
            "ops@hedge.finance".to_string(),
            "not an address".to_string(),
        ])
        .unwrap();
        assert_eq!(recipients.len(), 1);
    }

    #[test]
    fn all_bad_recipients_is_a_config_error() {
        let result = parse_recipients(&["not an address".to_string()]);
        assert!(matches!(result, Err(NotificationError::Config(_))));
    }

    #[test]
    fn notifier_requires_from_and_host() {
        let config = NotificationConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: Some("alerts@hedge.finance".to_string()),
            smtp_to: vec!["ops@hedge.finance".to_string()],
            smtp_tls: SmtpTls::StartTls,
            push_webhook_url: None,
        };
        assert!(matches!(
            SmtpNotifier::new(&config),
            Err(NotificationError::Config(_))
        ));
    }
}
