use serde::{Deserialize, Serialize};

use crate::models::{trim, trim_lower, Model};
use crate::validation::{FieldError, Validator};

pub const DEMO_STATUSES: &[&str] = &["new", "contacted", "scheduled", "completed", "archived"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDemo {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: String,
    pub message: String,
    pub product_interested: String,
    pub status: String,
}

impl Default for RequestDemo {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            company: String::new(),
            phone: String::new(),
            message: String::new(),
            product_interested: String::new(),
            status: "new".to_string(),
        }
    }
}

impl Model for RequestDemo {
    const COLLECTION: &'static str = "requestdemos";

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim_lower(&mut self.email);
        trim(&mut self.company);
        trim(&mut self.phone);
        trim(&mut self.message);
        trim(&mut self.product_interested);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("name", &self.name, "Name is required")
            .required("email", &self.email, "Email is required")
            .email("email", &self.email, "Please provide a valid email")
            .one_of("status", &self.status, DEMO_STATUSES, "Invalid status")
            .finish()
    }
}
