//! In-memory remote that answers like the REST API, with artificial latency.

use chrono::Duration;
use rand::Rng;
use serde_json::{json, Value};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use super::entity::{Entity, FieldValue};
use super::query::{apply, ListQuery};
use super::remote::{Method, Remote, RemoteRequest};
use super::seed;
use super::types::{Notification, Project, SearchResults, Task};
use crate::cache::{Clock, SystemClock};
use crate::error::{poisoned, Error, Result};

/// Backing store for one entity collection.
pub trait Repository<T>: Send + Sync {
  fn all(&self) -> Result<Vec<T>>;

  fn find(&self, id: &str) -> Result<Option<T>>;

  fn insert(&self, item: T) -> Result<()>;

  /// Replace the item with the same id. Returns false if there was none.
  fn replace(&self, item: T) -> Result<bool>;

  /// An id not used by any stored item.
  fn next_id(&self) -> Result<String>;
}

pub type ProjectRepository = dyn Repository<Project>;
pub type TaskRepository = dyn Repository<Task>;
pub type NotificationRepository = dyn Repository<Notification>;

/// Repository over a vector held in process memory.
pub struct MemoryRepository<T> {
  items: RwLock<Vec<T>>,
  sequence: AtomicU64,
}

impl<T: Entity> MemoryRepository<T> {
  pub fn new(items: Vec<T>) -> Self {
    let sequence = AtomicU64::new(items.len() as u64);
    Self {
      items: RwLock::new(items),
      sequence,
    }
  }
}

impl<T: Entity> Repository<T> for MemoryRepository<T> {
  fn all(&self) -> Result<Vec<T>> {
    Ok(self.items.read().map_err(poisoned)?.clone())
  }

  fn find(&self, id: &str) -> Result<Option<T>> {
    let items = self.items.read().map_err(poisoned)?;
    Ok(items.iter().find(|item| item.id() == id).cloned())
  }

  fn insert(&self, item: T) -> Result<()> {
    self.items.write().map_err(poisoned)?.push(item);
    Ok(())
  }

  fn replace(&self, item: T) -> Result<bool> {
    let mut items = self.items.write().map_err(poisoned)?;
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
      Some(slot) => {
        *slot = item;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  fn next_id(&self) -> Result<String> {
    loop {
      let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
      let id = format!("{}-{}", T::ID_PREFIX, n);
      if self.find(&id)?.is_none() {
        return Ok(id);
      }
    }
  }
}

/// Remote that serves requests from injected repositories.
pub struct MockRemote {
  projects: Arc<ProjectRepository>,
  tasks: Arc<TaskRepository>,
  notifications: Arc<NotificationRepository>,
  clock: Arc<dyn Clock>,
  /// Artificial response delay in milliseconds
  latency_ms: RangeInclusive<u64>,
}

impl MockRemote {
  pub fn new(
    projects: Arc<ProjectRepository>,
    tasks: Arc<TaskRepository>,
    notifications: Arc<NotificationRepository>,
  ) -> Self {
    Self {
      projects,
      tasks,
      notifications,
      clock: Arc::new(SystemClock),
      latency_ms: 0..=0,
    }
  }

  /// Mock backed by empty in-memory repositories.
  pub fn empty() -> Self {
    Self::new(
      Arc::new(MemoryRepository::<Project>::new(Vec::new())),
      Arc::new(MemoryRepository::<Task>::new(Vec::new())),
      Arc::new(MemoryRepository::<Notification>::new(Vec::new())),
    )
  }

  /// Mock backed by the demo production dataset.
  pub fn seeded() -> Self {
    Self::new(
      Arc::new(MemoryRepository::new(seed::projects())),
      Arc::new(MemoryRepository::new(seed::tasks())),
      Arc::new(MemoryRepository::new(seed::notifications())),
    )
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Delay every response by a uniformly random duration in `[min, max]` ms.
  pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
    self.latency_ms = min_ms.min(max_ms)..=max_ms.max(min_ms);
    self
  }

  fn pick_latency(&self) -> std::time::Duration {
    let ms = if self.latency_ms.start() == self.latency_ms.end() {
      *self.latency_ms.start()
    } else {
      rand::thread_rng().gen_range(self.latency_ms.clone())
    };
    std::time::Duration::from_millis(ms)
  }

  /// Route a request to the matching collection handler.
  fn handle(&self, request: &RemoteRequest) -> Result<Value> {
    let segments = request.segments();
    match (request.method, segments.as_slice()) {
      (Method::Get, ["search"]) => self.search(request),
      (Method::Post, ["notifications", "read-all"]) => self.mark_all_read(),
      (_, ["projects", rest @ ..]) => self.handle_collection(&*self.projects, request, rest),
      (_, ["tasks", rest @ ..]) => self.handle_collection(&*self.tasks, request, rest),
      (_, ["notifications", rest @ ..]) => {
        self.handle_collection(&*self.notifications, request, rest)
      }
      _ => Err(no_route(request)),
    }
  }

  fn handle_collection<T: Entity>(
    &self,
    repo: &dyn Repository<T>,
    request: &RemoteRequest,
    rest: &[&str],
  ) -> Result<Value> {
    match (request.method, rest) {
      (Method::Get, []) => {
        let query = ListQuery::from_params(&request.params)?;
        Ok(serde_json::to_value(apply(repo.all()?, &query)?)?)
      }
      (Method::Get, [id]) => {
        let item = repo.find(id)?.ok_or_else(|| Error::not_found(T::KIND, *id))?;
        Ok(serde_json::to_value(item)?)
      }
      (Method::Post, []) => self.create(repo, request.body.as_ref()),
      (Method::Patch, [id]) => self.update(repo, id, request.body.as_ref()),
      _ => Err(no_route(request)),
    }
  }

  fn create<T: Entity>(&self, repo: &dyn Repository<T>, body: Option<&Value>) -> Result<Value> {
    let now = self.clock.now();
    let mut value = serde_json::to_value(T::template())?;
    merge_fields(&mut value, body)?;
    value["id"] = Value::String(repo.next_id()?);
    value["createdAt"] = serde_json::to_value(now)?;
    value["updatedAt"] = serde_json::to_value(now)?;

    let item: T = serde_json::from_value(value)
      .map_err(|e| Error::Validation(format!("invalid {}: {}", T::KIND, e)))?;
    repo.insert(item.clone())?;
    debug!(kind = T::KIND, id = item.id(), "created");
    Ok(serde_json::to_value(item)?)
  }

  fn update<T: Entity>(
    &self,
    repo: &dyn Repository<T>,
    id: &str,
    body: Option<&Value>,
  ) -> Result<Value> {
    let existing = repo.find(id)?.ok_or_else(|| Error::not_found(T::KIND, id))?;
    let mut value = serde_json::to_value(&existing)?;
    merge_fields(&mut value, body)?;

    // Timestamps only ever move forward, even within one clock tick.
    let mut updated_at = self.clock.now();
    if let FieldValue::Timestamp(previous) = existing.field("updatedAt") {
      updated_at = updated_at.max(previous + Duration::milliseconds(1));
    }
    value["id"] = Value::String(id.to_string());
    value["createdAt"] = existing_field(&existing, "createdAt")?;
    value["updatedAt"] = serde_json::to_value(updated_at)?;

    let item: T = serde_json::from_value(value)
      .map_err(|e| Error::Validation(format!("invalid {}: {}", T::KIND, e)))?;
    repo.replace(item.clone())?;
    debug!(kind = T::KIND, id, "updated");
    Ok(serde_json::to_value(item)?)
  }

  fn search(&self, request: &RemoteRequest) -> Result<Value> {
    let term = request
      .params
      .iter()
      .find(|(name, _)| name == "q")
      .map(|(_, value)| value.trim())
      .unwrap_or_default();

    let mut results = SearchResults::default();
    if !term.is_empty() {
      results.projects = matching(self.projects.all()?, term);
      results.tasks = matching(self.tasks.all()?, term);
    }
    Ok(serde_json::to_value(results)?)
  }

  fn mark_all_read(&self) -> Result<Value> {
    let now = self.clock.now();
    let mut updated = 0;
    for notification in self.notifications.all()? {
      if notification.read {
        continue;
      }
      let updated_at = now.max(notification.updated_at + Duration::milliseconds(1));
      self.notifications.replace(Notification {
        read: true,
        updated_at,
        ..notification
      })?;
      updated += 1;
    }
    Ok(json!({ "updated": updated }))
  }
}

impl Remote for MockRemote {
  async fn send(&self, request: RemoteRequest) -> Result<Value> {
    let delay = self.pick_latency();
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    debug!(method = request.method.as_str(), path = %request.path, "mock request");
    self.handle(&request)
  }
}

fn matching<T: Entity>(items: Vec<T>, term: &str) -> Vec<T> {
  items
    .into_iter()
    .filter(|item| item.matches_term(term))
    .collect()
}

/// Overlay the body's fields onto `target`, ignoring server-owned fields.
fn merge_fields(target: &mut Value, body: Option<&Value>) -> Result<()> {
  let Some(body) = body else {
    return Ok(());
  };
  let fields = body
    .as_object()
    .ok_or_else(|| Error::Validation("request body must be a JSON object".into()))?;
  for (name, value) in fields {
    if matches!(name.as_str(), "id" | "createdAt" | "updatedAt") {
      continue;
    }
    target[name.as_str()] = value.clone();
  }
  Ok(())
}

fn existing_field<T: Entity>(item: &T, name: &str) -> Result<Value> {
  let value = serde_json::to_value(item)?;
  Ok(value.get(name).cloned().unwrap_or(Value::Null))
}

fn no_route(request: &RemoteRequest) -> Error {
  Error::Remote(format!(
    "404 no route for {} {}",
    request.method.as_str(),
    request.path
  ))
}
