//! Typed access to stored documents.
//!
//! `Repository<M>` converts between [`Stored<M>`] and raw driver documents and
//! enforces model validation and unique fields on every write.

use chrono::Utc;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{Document, Filter, StoreDriver, StoreError};
use crate::models::{Model, Stored};
use crate::validation::FieldError;

/// Fields a patch may never overwrite.
const PROTECTED_FIELDS: &[&str] = &["_id", "id", "createdAt", "updatedAt"];

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct Repository<M> {
    driver: Arc<dyn StoreDriver>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            _model: PhantomData,
        }
    }
}

impl<M: Model> Repository<M> {
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        Self {
            driver,
            _model: PhantomData,
        }
    }

    /// Create a document from an untyped request body.
    pub async fn create(&self, payload: Value) -> Result<Stored<M>, RepoError> {
        let model: M = serde_json::from_value(strip_protected(payload))
            .map_err(|e| RepoError::InvalidPayload(e.to_string()))?;
        self.insert(model).await
    }

    pub async fn insert(&self, mut model: M) -> Result<Stored<M>, RepoError> {
        model.normalize();
        model.validate().map_err(RepoError::Validation)?;
        self.ensure_unique(&model, None).await?;

        let now = Utc::now();
        let stored = Stored {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            inner: model,
        };
        self.driver
            .insert(M::COLLECTION, to_document(&stored)?)
            .await?;
        Ok(stored)
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<Stored<M>>, RepoError> {
        self.driver
            .find(M::COLLECTION, filter)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Stored<M>>, RepoError> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    /// Fetch by id; ids that are not UUIDs simply do not exist.
    pub async fn get(&self, id: &str) -> Result<Option<Stored<M>>, RepoError> {
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        self.driver
            .find_by_id(M::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Merge `patch` into the stored document, then re-run normalization and validation.
    pub async fn update(&self, id: &str, patch: Value) -> Result<Option<Stored<M>>, RepoError> {
        let Some(current) = self.get(id).await? else {
            return Ok(None);
        };
        let Value::Object(patch) = strip_protected(patch) else {
            return Err(RepoError::InvalidPayload("update body must be a JSON object".into()));
        };

        let mut merged = match serde_json::to_value(&current.inner)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        merge(&mut merged, patch);

        let mut model: M = serde_json::from_value(Value::Object(merged))
            .map_err(|e| RepoError::InvalidPayload(e.to_string()))?;
        model.normalize();
        model.validate().map_err(RepoError::Validation)?;
        self.ensure_unique(&model, Some(id)).await?;

        let stored = Stored {
            id: current.id,
            created_at: current.created_at,
            updated_at: Utc::now(),
            inner: model,
        };
        let replaced = self
            .driver
            .replace(M::COLLECTION, id, to_document(&stored)?)
            .await?;
        Ok(replaced.then_some(stored))
    }

    pub async fn delete(&self, id: &str) -> Result<Option<Stored<M>>, RepoError> {
        if Uuid::parse_str(id).is_err() {
            return Ok(None);
        }
        self.driver
            .delete_by_id(M::COLLECTION, id)
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn delete_all(&self) -> Result<u64, RepoError> {
        Ok(self.driver.delete_all(M::COLLECTION).await?)
    }

    async fn ensure_unique(&self, model: &M, exclude: Option<&str>) -> Result<(), RepoError> {
        if M::UNIQUE.is_empty() {
            return Ok(());
        }
        let fields = match serde_json::to_value(model)? {
            Value::Object(map) => map,
            _ => return Ok(()),
        };

        for field in M::UNIQUE {
            let Some(value) = fields.get(*field) else {
                continue;
            };
            let existing = self
                .driver
                .find(M::COLLECTION, &Filter::new().eq(*field, value.clone()))
                .await?;
            let taken = existing
                .iter()
                .any(|doc| doc.get("_id").and_then(Value::as_str) != exclude);
            if taken {
                return Err(RepoError::Duplicate((*field).to_string()));
            }
        }
        Ok(())
    }
}

/// Sort by `order` ascending, newest first within the same order.
pub fn by_order_then_newest<M>(items: &mut [Stored<M>], order: impl Fn(&M) -> i64) {
    items.sort_by(|a, b| {
        order(&a.inner)
            .cmp(&order(&b.inner))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

pub fn newest_first<M>(items: &mut [Stored<M>]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn strip_protected(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            for field in PROTECTED_FIELDS {
                map.remove(*field);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Shallow merge; nested objects are merged one level deep so partial
/// `hero` / `socialLinks` updates keep their sibling fields.
fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (k, v) in incoming {
                    existing.insert(k, v);
                }
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn to_document<M: Model>(stored: &Stored<M>) -> Result<Document, RepoError> {
    match serde_json::to_value(stored)? {
        Value::Object(map) => Ok(map),
        _ => Err(RepoError::InvalidPayload("model did not serialize to an object".into())),
    }
}

fn from_document<M: Model>(doc: Document) -> Result<Stored<M>, RepoError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectOptions, MemoryDriver};
    use crate::models::{Blog, Service, WebsiteSettings};
    use serde_json::json;

    async fn driver() -> Arc<dyn StoreDriver> {
        let driver = MemoryDriver::new();
        driver
            .connect("memory://test", &ConnectOptions::default())
            .await
            .unwrap();
        Arc::new(driver)
    }

    fn service(slug: &str) -> Value {
        json!({
            "title": "Sportsbook",
            "description": "Odds engine",
            "slug": slug,
            "category": "igaming"
        })
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let repo = Repository::<Service>::new(driver().await);
        let created = repo.create(service("sportsbook")).await.unwrap();

        assert!(Uuid::parse_str(&created.id).is_ok());
        assert_eq!(created.created_at, created.updated_at);
        let fetched = repo.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.inner, created.inner);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = Repository::<Service>::new(driver().await);
        repo.create(service("sportsbook")).await.unwrap();
        let err = repo.create(service("SportsBook")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(field) if field == "slug"));
    }

    #[tokio::test]
    async fn test_update_merges_and_revalidates() {
        let repo = Repository::<Service>::new(driver().await);
        let created = repo.create(service("sportsbook")).await.unwrap();

        let updated = repo
            .update(&created.id, json!({"order": 4, "_id": "ignored"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.inner.order, 4);
        assert_eq!(updated.inner.title, "Sportsbook");
        assert_eq!(updated.id, created.id);

        let err = repo
            .update(&created.id, json!({"category": "poker"}))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_own_unique_value() {
        let repo = Repository::<Blog>::new(driver().await);
        let blog = repo
            .create(json!({"title": "T", "content": "C", "author": "A", "slug": "t"}))
            .await
            .unwrap();
        let updated = repo
            .update(&blog.id, json!({"slug": "t", "published": true}))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.inner.published_at.is_some());
    }

    #[tokio::test]
    async fn test_nested_merge() {
        let repo = Repository::<WebsiteSettings>::new(driver().await);
        let settings = repo
            .create(json!({"hero": {"title": "Hi", "subtitle": "There"}}))
            .await
            .unwrap();
        let updated = repo
            .update(&settings.id, json!({"hero": {"title": "Hello"}}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.inner.hero.title, "Hello");
        assert_eq!(updated.inner.hero.subtitle, "There");
    }

    #[tokio::test]
    async fn test_malformed_ids_are_missing() {
        let repo = Repository::<Service>::new(driver().await);
        assert!(repo.get("not-a-uuid").await.unwrap().is_none());
        assert!(repo.delete("not-a-uuid").await.unwrap().is_none());
        assert!(repo.update("not-a-uuid", json!({})).await.unwrap().is_none());
    }

    #[test]
    fn test_sorting_helpers() {
        let now = Utc::now();
        let make = |order: i64, age_secs: i64| Stored {
            id: format!("{}-{}", order, age_secs),
            created_at: now - chrono::Duration::seconds(age_secs),
            updated_at: now,
            inner: Service {
                order,
                ..Service::default()
            },
        };
        let mut items = vec![make(2, 0), make(1, 10), make(1, 0)];
        by_order_then_newest(&mut items, |s| s.order);
        let ids: Vec<_> = items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1-0", "1-10", "2-0"]);
    }
}
