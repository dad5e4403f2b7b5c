use anyhow::Context;
use std::sync::Arc;

use crate::{
    delivery::{Dispatcher, SmtpConfig, TwilioConfig},
    notification::{NotificationHelper, NotificationService},
    user::user_repository::UserDirectory,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub notification_service: NotificationService,
    pub notification_helper: NotificationHelper,
    pub dispatcher: Dispatcher,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        notification_service: NotificationService,
        dispatcher: Dispatcher,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let notification_helper =
            NotificationHelper::new(notification_service.clone(), dispatcher.clone());
        Self {
            config,
            notification_service,
            notification_helper,
            dispatcher,
            users,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub smtp: Option<SmtpConfig>,
    pub twilio: Option<TwilioConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        let host = get("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match get("PORT") {
            Some(port) => port.parse().context("PORT must be a number")?,
            None => 3000,
        };
        let cors_origins = get("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);

        // A channel is only enabled when all of its credentials are present.
        let smtp = match (
            get("SMTP_HOST"),
            get("SMTP_USERNAME"),
            get("SMTP_PASSWORD"),
            get("SMTP_FROM"),
        ) {
            (Some(host), Some(username), Some(password), Some(from_email)) => Some(SmtpConfig {
                host,
                port: match get("SMTP_PORT") {
                    Some(port) => port.parse().context("SMTP_PORT must be a number")?,
                    None => 587,
                },
                username,
                password,
                from_email,
            }),
            _ => None,
        };

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            cors_origins,
            smtp,
            twilio,
        })
    }
}
