use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model};
use crate::validation::{FieldError, Validator};

pub const SERVICE_CATEGORIES: &[&str] = &["igaming", "crypto"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub image: String,
    pub slug: String,
    pub category: String,
    pub order: i64,
    pub is_active: bool,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            icon: String::new(),
            image: String::new(),
            slug: String::new(),
            category: String::new(),
            order: 0,
            is_active: true,
        }
    }
}

impl Model for Service {
    const COLLECTION: &'static str = "services";
    const UNIQUE: &'static [&'static str] = &["slug"];

    fn normalize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.icon);
        trim(&mut self.image);
        trim_lower(&mut self.slug);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("title", &self.title, "Service title is required")
            .required("description", &self.description, "Service description is required")
            .required("slug", &self.slug, "Service slug is required")
            .slug("slug", &self.slug, "Slug must be lowercase alphanumeric with hyphens")
            .one_of(
                "category",
                &self.category,
                SERVICE_CATEGORIES,
                "Category must be igaming or crypto",
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_and_normalization() {
        let mut service: Service = serde_json::from_value(json!({
            "title": "  Sportsbook ",
            "description": "Odds",
            "slug": " SportsBook ",
            "category": "igaming"
        }))
        .unwrap();
        service.normalize();

        assert_eq!(service.title, "Sportsbook");
        assert_eq!(service.slug, "sportsbook");
        assert!(service.is_active);
        assert_eq!(service.order, 0);
        assert!(service.validate().is_ok());
    }

    #[test]
    fn test_rejects_unknown_category() {
        let service = Service {
            title: "x".into(),
            description: "y".into(),
            slug: "x".into(),
            category: "poker".into(),
            ..Service::default()
        };
        let errors = service.validate().unwrap_err();
        assert_eq!(errors[0].field, "category");
    }
}
