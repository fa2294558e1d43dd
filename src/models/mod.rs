//! Document models.
//!
//! Each model is a plain serde struct with camelCase fields. Persisted
//! documents are wrapped in [`Stored`], which adds the id and timestamps.

pub mod admin;
pub mod blog;
pub mod contact;
pub mod demo_request;
pub mod product;
pub mod service;
pub mod settings;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::validation::FieldError;

pub use admin::{Admin, AdminProfile, AdminRole};
pub use blog::Blog;
pub use contact::{ContactForm, CONTACT_STATUSES};
pub use demo_request::{RequestDemo, DEMO_STATUSES};
pub use product::Product;
pub use service::{Service, SERVICE_CATEGORIES};
pub use settings::{HeroSection, SocialLinks, WebsiteSettings};

pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the documents are stored in.
    const COLLECTION: &'static str;

    /// Top-level fields that must be unique across the collection.
    const UNIQUE: &'static [&'static str] = &[];

    /// Trim, lowercase and fill derived fields before validation.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

/// A persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stored<M> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub inner: M,
}

pub(crate) fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

pub(crate) fn trim_lower(value: &mut String) {
    *value = value.trim().to_lowercase();
}
