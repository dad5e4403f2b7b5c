use async_trait::async_trait;
use reqwest::Client;

use super::{ChannelSender, DeliveryError, OutboundMessage};
use crate::notification::notification_models::DeliveryChannel;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Text messages through the Twilio Messages API.
pub struct SmsSender {
    config: TwilioConfig,
    http_client: Client,
}

impl SmsSender {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            config,
            http_client: Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API_BASE, self.config.account_sid
        )
    }
}

#[async_trait]
impl ChannelSender for SmsSender {
    fn channel(&self) -> DeliveryChannel {
        DeliveryChannel::Sms
    }

    /// SMS carries only the body; the subject is dropped.
    async fn deliver(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError> {
        let params = [
            ("To", recipient),
            ("From", self.config.from_number.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::SendFailed(format!(
            "Twilio responded {}: {}",
            status, body
        )))
    }
}
