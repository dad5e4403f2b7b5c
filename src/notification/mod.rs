pub mod notification_dto;
pub mod notification_handlers;
pub mod notification_helper;
pub mod notification_memory_store;
pub mod notification_models;
pub mod notification_repository;
pub mod notification_service;
pub mod notification_templates;

pub use notification_helper::NotificationHelper;
pub use notification_memory_store::InMemoryNotificationStore;
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use notification_service::NotificationService;
