//! Best-effort delivery of stored notifications over email and SMS.

pub mod dispatcher;
pub mod email;
pub mod sms;

use async_trait::async_trait;
use thiserror::Error;

use crate::notification::notification_models::DeliveryChannel;

pub use dispatcher::{DeliveryReport, Dispatcher};
pub use email::{EmailSender, SmtpConfig};
pub use sms::{SmsSender, TwilioConfig};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid channel configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// A notification rendered for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> DeliveryChannel;

    async fn deliver(
        &self,
        recipient: &str,
        message: &OutboundMessage,
    ) -> Result<(), DeliveryError>;
}
