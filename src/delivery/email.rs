use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ChannelSender, DeliveryError, OutboundMessage};
use crate::notification::notification_models::DeliveryChannel;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

/// Plain-text email over an SMTP relay.
pub struct EmailSender {
    from: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            from: config.from_email.clone(),
            mailer,
        })
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Email
    }

    async fn deliver(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| DeliveryError::InvalidConfig(format!("Invalid from: {}", e)))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| DeliveryError::InvalidRecipient(format!("Invalid to: {}", e)))?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        Ok(())
    }
}
