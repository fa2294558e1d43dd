use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model, Stored};
use crate::validation::{FieldError, Validator};

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Blog {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub thumbnail: String,
    pub author: String,
    pub slug: String,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
}

impl Model for Blog {
    const COLLECTION: &'static str = "blogs";
    const UNIQUE: &'static [&'static str] = &["slug"];

    fn normalize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.excerpt);
        trim(&mut self.thumbnail);
        trim(&mut self.author);
        trim_lower(&mut self.slug);

        if self.excerpt.is_empty() && !self.content.is_empty() {
            let head: String = self.content.chars().take(EXCERPT_CHARS).collect();
            self.excerpt = format!("{}...", head);
        }
        if self.published && self.published_at.is_none() {
            self.published_at = Some(Utc::now());
        }
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("title", &self.title, "Blog title is required")
            .required("content", &self.content, "Blog content is required")
            .required("author", &self.author, "Author name is required")
            .required("slug", &self.slug, "Blog slug is required")
            .slug("slug", &self.slug, "Slug must be lowercase alphanumeric with hyphens")
            .finish()
    }
}

impl Stored<Blog> {
    /// `YYYY-MM-DD` of the publication date, falling back to creation.
    pub fn display_date(&self) -> String {
        self.inner
            .published_at
            .unwrap_or(self.created_at)
            .format("%Y-%m-%d")
            .to_string()
    }
}
