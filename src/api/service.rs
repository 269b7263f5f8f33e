//! Data service that wraps a remote with transparent caching.

use chrono::Duration;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::form_urlencoded;

use super::entity::Entity;
use super::query::{ListQuery, Page};
use super::remote::{Remote, RemoteRequest};
use super::types::{Notification, NotificationPatch, SearchResults, Task};
use crate::cache::{CacheLayer, CacheResult, KeyPattern};
use crate::error::{Error, Result};

/// Freshness windows per kind of read.
#[derive(Debug, Clone, Copy)]
pub struct TtlPolicy {
  pub default: Duration,
  pub notifications: Duration,
  pub search: Duration,
}

impl Default for TtlPolicy {
  fn default() -> Self {
    Self {
      default: Duration::minutes(5),
      notifications: Duration::minutes(1),
      search: Duration::seconds(30),
    }
  }
}

impl TtlPolicy {
  fn for_collection(&self, collection: &str) -> Duration {
    if collection == Notification::COLLECTION {
      self.notifications
    } else {
      self.default
    }
  }
}

/// Typed access to projects, tasks and notifications.
///
/// Reads go through the cache; writes go straight to the remote and then
/// invalidate the keys they affect. Callers never see whether a result came
/// from the cache.
pub struct DataService<R: Remote> {
  remote: R,
  cache: CacheLayer,
  ttl: TtlPolicy,
}

impl<R: Remote> DataService<R> {
  pub fn new(remote: R, cache: CacheLayer) -> Self {
    Self {
      remote,
      cache,
      ttl: TtlPolicy::default(),
    }
  }

  pub fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
    self.ttl = ttl;
    self
  }

  /// Run a GET through the cache and decode the payload.
  async fn cached_get<T: serde::Serialize + DeserializeOwned>(
    &self,
    key: &str,
    ttl: Duration,
    request: RemoteRequest,
  ) -> Result<CacheResult<T>> {
    self
      .cache
      .fetch_cached(key, ttl, || async move {
        let value = self.remote.send(request).await?;
        Ok(serde_json::from_value::<T>(value)?)
      })
      .await
  }

  /// List a collection, with the cache-source metadata.
  pub async fn list_with_source<T: Entity>(&self, query: &ListQuery) -> Result<CacheResult<Page<T>>> {
    query.validate::<T>()?;
    let path = collection_path::<T>();
    let key = query.cache_key(&path);
    let request = RemoteRequest::get(path).with_params(query.params());
    self
      .cached_get(&key, self.ttl.for_collection(T::COLLECTION), request)
      .await
  }

  pub async fn list<T: Entity>(&self, query: &ListQuery) -> Result<Page<T>> {
    Ok(self.list_with_source(query).await?.data)
  }

  /// Fetch one entity; `Error::NotFound` if it does not exist.
  pub async fn get<T: Entity>(&self, id: &str) -> Result<T> {
    let path = entity_path::<T>(id);
    let request = RemoteRequest::get(path.clone());
    let result = self
      .cached_get(&path, self.ttl.for_collection(T::COLLECTION), request)
      .await?;
    Ok(result.data)
  }

  /// Create an entity from a patch merged over the collection's template.
  pub async fn create<T: Entity>(&self, patch: &T::Patch) -> Result<T> {
    let body = serde_json::to_value(patch)?;
    let value = self
      .remote
      .send(RemoteRequest::post(collection_path::<T>(), body))
      .await?;
    let created: T = serde_json::from_value(value)?;

    self.invalidate(Some(KeyPattern::from(collection_path::<T>())))?;
    self.invalidate_search()?;
    self.prune_cache()?;
    info!(kind = T::KIND, id = created.id(), "created");
    Ok(created)
  }

  /// Merge a patch over an existing entity; `Error::NotFound` if absent.
  pub async fn update<T: Entity>(&self, id: &str, patch: &T::Patch) -> Result<T> {
    let body = serde_json::to_value(patch)?;
    let path = entity_path::<T>(id);
    let value = self.remote.send(RemoteRequest::patch(path.clone(), body)).await?;
    let updated: T = serde_json::from_value(value)?;

    self.cache.invalidate_key(&path)?;
    self.invalidate(Some(KeyPattern::from(format!("{}?", collection_path::<T>()))))?;
    self.cache.invalidate_key(&collection_path::<T>())?;
    self.invalidate_search()?;
    self.prune_cache()?;
    info!(kind = T::KIND, id, "updated");
    Ok(updated)
  }

  /// Drop cached entries matching `pattern`, or everything.
  pub fn invalidate(&self, pattern: Option<KeyPattern>) -> Result<usize> {
    self.cache.invalidate(pattern)
  }

  fn invalidate_search(&self) -> Result<usize> {
    self.invalidate(Some(KeyPattern::from("/search?")))
  }

  /// Tasks belonging to one project.
  pub async fn tasks_for_project(&self, project_id: &str, query: &ListQuery) -> Result<Page<Task>> {
    let query = query.clone().filter("projectId", project_id);
    self.list::<Task>(&query).await
  }

  /// Free-text search over projects and tasks.
  pub async fn search(&self, term: &str) -> Result<SearchResults> {
    let term = term.trim();
    let key = search_key(term);
    let request = RemoteRequest::get("/search").param("q", term);
    let result = self.cached_get(&key, self.ttl.search, request).await?;
    Ok(result.data)
  }

  pub async fn mark_notification_read(&self, id: &str) -> Result<Notification> {
    let patch = NotificationPatch {
      read: Some(true),
      ..Default::default()
    };
    self.update::<Notification>(id, &patch).await
  }

  /// Mark every notification read, returning how many changed.
  pub async fn mark_all_notifications_read(&self) -> Result<u64> {
    let value = self
      .remote
      .send(RemoteRequest::post(
        format!("{}/read-all", collection_path::<Notification>()),
        Value::Object(Default::default()),
      ))
      .await?;
    self.invalidate(Some(KeyPattern::from(collection_path::<Notification>())))?;
    value.get("updated").and_then(Value::as_u64).ok_or_else(|| {
      Error::Remote(format!("read-all reply has no 'updated' count: {}", value))
    })
  }

  /// Reclaim memory held by expired cache entries. Runs after every write.
  pub fn prune_cache(&self) -> Result<usize> {
    let pruned = self.cache.prune_expired()?;
    if pruned > 0 {
      debug!(pruned, "pruned expired cache entries");
    }
    Ok(pruned)
  }
}

fn collection_path<T: Entity>() -> String {
  format!("/{}", T::COLLECTION)
}

fn search_key(term: &str) -> String {
  let query = form_urlencoded::Serializer::new(String::new())
    .append_pair("q", term)
    .finish();
  format!("/search?{}", query)
}

fn entity_path<T: Entity>(id: &str) -> String {
  format!("/{}/{}", T::COLLECTION, id)
}
