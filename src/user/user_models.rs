use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::notification::notification_models::Language;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub language: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        matches!(self.role.as_str(), "admin" | "super_admin")
    }

    pub fn preferred_language(&self) -> Language {
        Language::from_code(&self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, language: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Layla".to_string(),
            email: None,
            mobile: None,
            language: language.to_string(),
            role: role.to_string(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_roles() {
        assert!(user("admin", "en").is_admin());
        assert!(user("super_admin", "en").is_admin());
        assert!(!user("staff", "en").is_admin());
        assert!(!user("customer", "en").is_admin());
    }

    #[test]
    fn test_preferred_language() {
        assert_eq!(user("customer", "ar").preferred_language(), Language::Ar);
        assert_eq!(user("customer", "en").preferred_language(), Language::En);
    }
}
