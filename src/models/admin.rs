use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model, Stored};
use crate::validation::{FieldError, Validator};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
    Superadmin,
}

/// Stored administrator account. `password` holds the bcrypt hash and never
/// leaves the repository layer; responses use [`AdminProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Admin {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: AdminRole,
    pub is_active: bool,
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            name: "Admin".to_string(),
            role: AdminRole::Admin,
            is_active: true,
        }
    }
}

impl Model for Admin {
    const COLLECTION: &'static str = "admins";
    const UNIQUE: &'static [&'static str] = &["email"];

    fn normalize(&mut self) {
        trim_lower(&mut self.email);
        trim(&mut self.name);
        if self.name.is_empty() {
            self.name = "Admin".to_string();
        }
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .email("email", &self.email, "Please provide a valid email")
            .required("password", &self.password, "Password is required")
            .finish()
    }
}

/// Public view of an admin account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Stored<Admin>> for AdminProfile {
    fn from(admin: &Stored<Admin>) -> Self {
        Self {
            id: admin.id.clone(),
            email: admin.inner.email.clone(),
            name: admin.inner.name.clone(),
            role: admin.inner.role,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_omits_password() {
        let now = Utc::now();
        let stored = Stored {
            id: "abc".into(),
            created_at: now,
            updated_at: now,
            inner: Admin {
                email: "admin@anergia.com".into(),
                password: "$2b$10$hash".into(),
                ..Admin::default()
            },
        };
        let json = serde_json::to_value(AdminProfile::from(&stored)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "admin");
        assert_eq!(json["id"], "abc");
    }
}
