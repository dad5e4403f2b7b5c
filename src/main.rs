use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travel_notifications::{
    db::{create_pool, run_migrations},
    delivery::{ChannelSender, Dispatcher, EmailSender, SmsSender},
    notification::{NotificationRepository, NotificationService, NotificationStore},
    routes::create_router,
    state::{AppState, Config},
    user::{UserDirectory, UserRepository},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,travel_notifications=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    // Sanitize URL for logging (hide password)
    let url_for_logging = config
        .database_url
        .split('@')
        .last()
        .map(|part| format!("<hidden>@{}", part))
        .unwrap_or_else(|| "<invalid format>".to_string());

    tracing::info!("Connecting to database at {}...", url_for_logging);
    let db = create_pool(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to database at {}", url_for_logging))?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await.context("Failed to run migrations")?;

    let store: Arc<dyn NotificationStore> = Arc::new(NotificationRepository::new(db.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(UserRepository::new(db.clone()));

    let mut channels: Vec<Arc<dyn ChannelSender>> = Vec::new();
    match &config.smtp {
        Some(smtp) => {
            channels.push(Arc::new(
                EmailSender::new(smtp).context("Invalid SMTP configuration")?,
            ));
            tracing::info!(host = %smtp.host, "email delivery enabled");
        }
        None => tracing::debug!("SMTP credentials not set, email delivery disabled"),
    }
    match &config.twilio {
        Some(twilio) => {
            channels.push(Arc::new(SmsSender::new(twilio.clone())));
            tracing::info!("SMS delivery enabled");
        }
        None => tracing::debug!("Twilio credentials not set, SMS delivery disabled"),
    }

    let notification_service = NotificationService::new(store.clone());
    let dispatcher = Dispatcher::new(store, users.clone(), channels);
    let state = AppState::new(config.clone(), notification_service, dispatcher, users);

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
