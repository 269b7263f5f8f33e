//! Domain types served by the data service.
//!
//! JSON field names are camelCase and enum values snake_case, matching the
//! REST payloads.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, FieldKind, FieldValue};

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Urgent,
}

impl Priority {
  pub const NAMES: &'static [&'static str] = &["low", "medium", "high", "urgent"];

  pub fn as_str(&self) -> &'static str {
    Self::NAMES[*self as usize]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
  #[default]
  Planning,
  Active,
  OnHold,
  Completed,
  Archived,
}

impl ProjectStatus {
  pub const NAMES: &'static [&'static str] =
    &["planning", "active", "on_hold", "completed", "archived"];

  pub fn as_str(&self) -> &'static str {
    Self::NAMES[*self as usize]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  #[default]
  Todo,
  InProgress,
  Review,
  Done,
  Blocked,
}

impl TaskStatus {
  pub const NAMES: &'static [&'static str] = &["todo", "in_progress", "review", "done", "blocked"];

  pub fn as_str(&self) -> &'static str {
    Self::NAMES[*self as usize]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  Mention,
  Assignment,
  StatusChange,
  Comment,
  Deadline,
  #[default]
  System,
}

impl NotificationKind {
  pub const NAMES: &'static [&'static str] = &[
    "mention",
    "assignment",
    "status_change",
    "comment",
    "deadline",
    "system",
  ];

  pub fn as_str(&self) -> &'static str {
    Self::NAMES[*self as usize]
  }
}

fn optional_text(value: &Option<String>) -> FieldValue {
  value
    .as_ref()
    .map(|v| FieldValue::Text(v.clone()))
    .unwrap_or(FieldValue::Missing)
}

fn optional_date(value: Option<NaiveDate>) -> FieldValue {
  value.map(FieldValue::Date).unwrap_or(FieldValue::Missing)
}

// ============================================================================
// Project
// ============================================================================

/// A production (show, feature, commercial).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub status: ProjectStatus,
  #[serde(default)]
  pub priority: Priority,
  pub owner: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  /// Percent complete, 0-100
  #[serde(default)]
  pub progress: u8,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ProjectStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub progress: Option<u8>,
}

impl Entity for Project {
  type Patch = ProjectPatch;

  const COLLECTION: &'static str = "projects";
  const KIND: &'static str = "project";
  const ID_PREFIX: &'static str = "proj";
  const FIELDS: &'static [(&'static str, FieldKind)] = &[
    ("id", FieldKind::Key),
    ("name", FieldKind::Text),
    ("description", FieldKind::Text),
    ("status", FieldKind::Ordinal(ProjectStatus::NAMES)),
    ("priority", FieldKind::Ordinal(Priority::NAMES)),
    ("owner", FieldKind::Text),
    ("startDate", FieldKind::Date),
    ("dueDate", FieldKind::Date),
    ("progress", FieldKind::Number),
    ("createdAt", FieldKind::Timestamp),
    ("updatedAt", FieldKind::Timestamp),
  ];

  fn id(&self) -> &str {
    &self.id
  }

  fn field(&self, name: &str) -> FieldValue {
    match name {
      "id" => FieldValue::Key(self.id.clone()),
      "name" => FieldValue::Text(self.name.clone()),
      "description" => FieldValue::Text(self.description.clone()),
      "status" => FieldValue::ordinal(ProjectStatus::NAMES, self.status.as_str()),
      "priority" => FieldValue::ordinal(Priority::NAMES, self.priority.as_str()),
      "owner" => optional_text(&self.owner),
      "startDate" => optional_date(self.start_date),
      "dueDate" => optional_date(self.due_date),
      "progress" => FieldValue::Number(f64::from(self.progress)),
      "createdAt" => FieldValue::Timestamp(self.created_at),
      "updatedAt" => FieldValue::Timestamp(self.updated_at),
      _ => FieldValue::Missing,
    }
  }

  fn template() -> Self {
    Project {
      id: String::new(),
      name: "Untitled project".to_string(),
      description: String::new(),
      status: ProjectStatus::Planning,
      priority: Priority::Medium,
      owner: None,
      start_date: None,
      due_date: None,
      progress: 0,
      created_at: DateTime::<Utc>::default(),
      updated_at: DateTime::<Utc>::default(),
    }
  }
}

// ============================================================================
// Task
// ============================================================================

/// A unit of work on a project (a shot, an asset, a review).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: String,
  pub project_id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub status: TaskStatus,
  #[serde(default)]
  pub priority: Priority,
  pub assignee: Option<String>,
  pub start_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub estimated_hours: Option<f64>,
  #[serde(default)]
  pub tags: Vec<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<TaskStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assignee: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub estimated_hours: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tags: Option<Vec<String>>,
}

impl Entity for Task {
  type Patch = TaskPatch;

  const COLLECTION: &'static str = "tasks";
  const KIND: &'static str = "task";
  const ID_PREFIX: &'static str = "task";
  const FIELDS: &'static [(&'static str, FieldKind)] = &[
    ("id", FieldKind::Key),
    ("projectId", FieldKind::Key),
    ("title", FieldKind::Text),
    ("description", FieldKind::Text),
    ("status", FieldKind::Ordinal(TaskStatus::NAMES)),
    ("priority", FieldKind::Ordinal(Priority::NAMES)),
    ("assignee", FieldKind::Text),
    ("startDate", FieldKind::Date),
    ("dueDate", FieldKind::Date),
    ("estimatedHours", FieldKind::Number),
    ("tags", FieldKind::List),
    ("createdAt", FieldKind::Timestamp),
    ("updatedAt", FieldKind::Timestamp),
  ];

  fn id(&self) -> &str {
    &self.id
  }

  fn field(&self, name: &str) -> FieldValue {
    match name {
      "id" => FieldValue::Key(self.id.clone()),
      "projectId" => FieldValue::Key(self.project_id.clone()),
      "title" => FieldValue::Text(self.title.clone()),
      "description" => FieldValue::Text(self.description.clone()),
      "status" => FieldValue::ordinal(TaskStatus::NAMES, self.status.as_str()),
      "priority" => FieldValue::ordinal(Priority::NAMES, self.priority.as_str()),
      "assignee" => optional_text(&self.assignee),
      "startDate" => optional_date(self.start_date),
      "dueDate" => optional_date(self.due_date),
      "estimatedHours" => self
        .estimated_hours
        .map(FieldValue::Number)
        .unwrap_or(FieldValue::Missing),
      "tags" => FieldValue::List(self.tags.clone()),
      "createdAt" => FieldValue::Timestamp(self.created_at),
      "updatedAt" => FieldValue::Timestamp(self.updated_at),
      _ => FieldValue::Missing,
    }
  }

  fn template() -> Self {
    Task {
      id: String::new(),
      project_id: String::new(),
      title: "Untitled task".to_string(),
      description: String::new(),
      status: TaskStatus::Todo,
      priority: Priority::Medium,
      assignee: None,
      start_date: None,
      due_date: None,
      estimated_hours: None,
      tags: Vec::new(),
      created_at: DateTime::<Utc>::default(),
      updated_at: DateTime::<Utc>::default(),
    }
  }
}

// ============================================================================
// Notification
// ============================================================================

/// An inbox entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: String,
  #[serde(default)]
  pub kind: NotificationKind,
  pub title: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub read: bool,
  pub link: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotificationPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kind: Option<NotificationKind>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub read: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub link: Option<String>,
}

impl Entity for Notification {
  type Patch = NotificationPatch;

  const COLLECTION: &'static str = "notifications";
  const KIND: &'static str = "notification";
  const ID_PREFIX: &'static str = "notif";
  const FIELDS: &'static [(&'static str, FieldKind)] = &[
    ("id", FieldKind::Key),
    ("kind", FieldKind::Ordinal(NotificationKind::NAMES)),
    ("title", FieldKind::Text),
    ("message", FieldKind::Text),
    ("read", FieldKind::Flag),
    ("link", FieldKind::Text),
    ("createdAt", FieldKind::Timestamp),
    ("updatedAt", FieldKind::Timestamp),
  ];

  fn id(&self) -> &str {
    &self.id
  }

  fn field(&self, name: &str) -> FieldValue {
    match name {
      "id" => FieldValue::Key(self.id.clone()),
      "kind" => FieldValue::ordinal(NotificationKind::NAMES, self.kind.as_str()),
      "title" => FieldValue::Text(self.title.clone()),
      "message" => FieldValue::Text(self.message.clone()),
      "read" => FieldValue::Flag(self.read),
      "link" => optional_text(&self.link),
      "createdAt" => FieldValue::Timestamp(self.created_at),
      "updatedAt" => FieldValue::Timestamp(self.updated_at),
      _ => FieldValue::Missing,
    }
  }

  fn template() -> Self {
    Notification {
      id: String::new(),
      kind: NotificationKind::System,
      title: "Notification".to_string(),
      message: String::new(),
      read: false,
      link: None,
      created_at: DateTime::<Utc>::default(),
      updated_at: DateTime::<Utc>::default(),
    }
  }
}

// ============================================================================
// Search
// ============================================================================

/// Cross-collection free-text search result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
  pub projects: Vec<Project>,
  pub tasks: Vec<Task>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::entity::patch_from_assignments;

  #[test]
  fn test_enum_names_match_serde() {
    assert_eq!(
      serde_json::to_value(TaskStatus::InProgress).unwrap(),
      serde_json::json!(TaskStatus::InProgress.as_str())
    );
    assert_eq!(
      serde_json::to_value(ProjectStatus::OnHold).unwrap(),
      serde_json::json!("on_hold")
    );
    assert_eq!(
      serde_json::to_value(NotificationKind::StatusChange).unwrap(),
      serde_json::json!(NotificationKind::StatusChange.as_str())
    );
  }

  #[test]
  fn test_patch_from_assignments() {
    let patch = patch_from_assignments::<Task>(&[
      ("status".to_string(), "done".to_string()),
      ("estimatedHours".to_string(), "12".to_string()),
      ("tags".to_string(), "comp,hero".to_string()),
    ])
    .unwrap();

    assert_eq!(patch.status, Some(TaskStatus::Done));
    assert_eq!(patch.estimated_hours, Some(12.0));
    assert_eq!(patch.tags, Some(vec!["comp".to_string(), "hero".to_string()]));
    assert!(patch.title.is_none());
  }

  #[test]
  fn test_patch_rejects_unknown_and_readonly_fields() {
    let unknown = patch_from_assignments::<Project>(&[("budget".into(), "10".into())]);
    assert!(unknown.is_err());

    // Listed for filtering but not writable
    let readonly = patch_from_assignments::<Project>(&[("createdAt".into(), "2025-01-01T00:00:00Z".into())]);
    assert!(readonly.is_err());
  }

  #[test]
  fn test_patch_serializes_only_set_fields() {
    let patch = NotificationPatch {
      read: Some(true),
      ..Default::default()
    };
    assert_eq!(serde_json::to_value(&patch).unwrap(), serde_json::json!({"read": true}));
  }

  #[test]
  fn test_task_matches_term_over_text_fields() {
    let task = Task {
      title: "SH040 roto cleanup".into(),
      tags: vec!["roto".into()],
      ..Task::template()
    };
    assert!(task.matches_term("ROTO"));
    assert!(!task.matches_term("lighting"));
  }
}
