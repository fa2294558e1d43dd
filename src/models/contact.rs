use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model};
use crate::validation::{FieldError, Validator};

pub const CONTACT_STATUSES: &[&str] = &["new", "read", "replied", "archived"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub subject: String,
    pub message: String,
    pub status: String,
}

impl Default for ContactForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            company: String::new(),
            subject: String::new(),
            message: String::new(),
            status: "new".to_string(),
        }
    }
}

impl Model for ContactForm {
    const COLLECTION: &'static str = "contactforms";

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim_lower(&mut self.email);
        trim(&mut self.phone);
        trim(&mut self.company);
        trim(&mut self.subject);
        trim(&mut self.message);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("name", &self.name, "Name is required")
            .email("email", &self.email, "Please provide a valid email")
            .required("message", &self.message, "Message is required")
            .one_of("status", &self.status, CONTACT_STATUSES, "Invalid status")
            .finish()
    }
}
