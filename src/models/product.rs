use serde::{Deserialize, Serialize};

use crate::models::{trim, Model};
use crate::validation::{FieldError, Validator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: Option<f64>,
    pub category: String,
    pub featured: bool,
    pub features: Vec<String>,
    pub order: i64,
    pub is_active: bool,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            image: String::new(),
            price: None,
            category: String::new(),
            featured: false,
            features: Vec::new(),
            order: 0,
            is_active: true,
        }
    }
}

impl Model for Product {
    const COLLECTION: &'static str = "products";

    fn normalize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.description);
        trim(&mut self.image);
        trim(&mut self.category);
    }

    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Validator::new()
            .required("name", &self.name, "Product name is required")
            .required("description", &self.description, "Product description is required")
            .rule(
                self.price.map_or(true, |p| p >= 0.0),
                "price",
                "Price must not be negative",
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let product = Product {
            name: "Wallet".into(),
            description: "Custody".into(),
            price: Some(-1.0),
            ..Product::default()
        };
        assert_eq!(product.validate().unwrap_err()[0].field, "price");
    }

    #[test]
    fn test_price_may_be_null() {
        let product: Product =
            serde_json::from_str(r#"{"name":"Wallet","description":"Custody","price":null}"#).unwrap();
        assert!(product.price.is_none());
        assert!(product.validate().is_ok());
    }
}
