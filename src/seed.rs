//! Bundled demo content for a fresh database.
//!
//! `seed` wipes the content collections (services, products, blogs, settings)
//! and inserts the records from `data/seed.json`. Leads and admins are left alone.

use serde::Deserialize;
use std::sync::Arc;

use crate::db::StoreDriver;
use crate::models::{Blog, Model, Product, Service, WebsiteSettings};
use crate::repository::{RepoError, Repository};

const SEED_JSON: &str = include_str!("../data/seed.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SeedData {
    pub services: Vec<Service>,
    pub products: Vec<Product>,
    pub blogs: Vec<Blog>,
    pub settings: WebsiteSettings,
}

/// Number of documents written per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub services: usize,
    pub products: usize,
    pub blogs: usize,
    pub settings: usize,
}

pub fn bundled() -> Result<SeedData, serde_json::Error> {
    serde_json::from_str(SEED_JSON)
}

async fn replace_all<M: Model>(driver: &Arc<dyn StoreDriver>, items: Vec<M>) -> Result<usize, RepoError> {
    let repo = Repository::<M>::new(Arc::clone(driver));
    let removed = repo.delete_all().await?;
    tracing::debug!(collection = M::COLLECTION, removed, "Cleared collection");

    let count = items.len();
    for item in items {
        repo.insert(item).await?;
    }
    tracing::info!(collection = M::COLLECTION, count, "Seeded collection");
    Ok(count)
}

pub async fn seed(driver: &Arc<dyn StoreDriver>, data: SeedData) -> Result<SeedSummary, RepoError> {
    Ok(SeedSummary {
        services: replace_all(driver, data.services).await?,
        products: replace_all(driver, data.products).await?,
        blogs: replace_all(driver, data.blogs).await?,
        settings: replace_all(driver, vec![data.settings]).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectOptions, Filter, MemoryDriver};

    #[test]
    fn test_bundled_data_is_valid() {
        let data = bundled().unwrap();
        assert!(!data.services.is_empty());
        for service in &data.services {
            service.validate().unwrap();
        }
        for product in &data.products {
            product.validate().unwrap();
        }
        assert_eq!(data.settings.site_name, "Anergia");
    }

    #[tokio::test]
    async fn test_seed_replaces_content() {
        let memory = MemoryDriver::new();
        memory
            .connect("memory://seed", &ConnectOptions::default())
            .await
            .unwrap();
        let driver: Arc<dyn StoreDriver> = Arc::new(memory);

        let first = seed(&driver, bundled().unwrap()).await.unwrap();
        let second = seed(&driver, bundled().unwrap()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.settings, 1);

        let services = Repository::<Service>::new(Arc::clone(&driver))
            .find(&Filter::new())
            .await
            .unwrap();
        assert_eq!(services.len(), first.services);
    }
}
