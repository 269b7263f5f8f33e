//! Demo dataset for the mock remote: two shows, their shots, an inbox.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use super::types::{
  Notification, NotificationKind, Priority, Project, ProjectStatus, Task, TaskStatus,
};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(y, m, d)
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(y, m, d, h, 0, 0)
    .single()
    .unwrap_or_default()
}

pub fn projects() -> Vec<Project> {
  vec![
    Project {
      id: "proj-1".into(),
      name: "Nebula Drift".into(),
      description: "Feature film, 240 shots of space and atmospherics".into(),
      status: ProjectStatus::Active,
      priority: Priority::High,
      owner: Some("Mara Okafor".into()),
      start_date: date(2025, 1, 6),
      due_date: date(2025, 6, 27),
      progress: 42,
      created_at: at(2024, 11, 18, 9),
      updated_at: at(2025, 2, 20, 16),
    },
    Project {
      id: "proj-2".into(),
      name: "Harbor Lights".into(),
      description: "Streaming series, episode 104 cleanup and set extensions".into(),
      status: ProjectStatus::Planning,
      priority: Priority::Medium,
      owner: Some("Ilya Brandt".into()),
      start_date: date(2025, 3, 3),
      due_date: date(2025, 8, 29),
      progress: 5,
      created_at: at(2025, 1, 14, 10),
      updated_at: at(2025, 2, 3, 11),
    },
    Project {
      id: "proj-3".into(),
      name: "Copperline Spot".into(),
      description: "30 second commercial, product hero shots".into(),
      status: ProjectStatus::Completed,
      priority: Priority::Low,
      owner: None,
      start_date: date(2024, 10, 1),
      due_date: date(2024, 12, 13),
      progress: 100,
      created_at: at(2024, 9, 20, 15),
      updated_at: at(2024, 12, 13, 18),
    },
  ]
}

#[allow(clippy::too_many_arguments)]
fn task(
  id: &str,
  project_id: &str,
  title: &str,
  status: TaskStatus,
  priority: Priority,
  assignee: Option<&str>,
  start: Option<NaiveDate>,
  due: Option<NaiveDate>,
  estimated_hours: Option<f64>,
  tags: &[&str],
) -> Task {
  Task {
    id: id.into(),
    project_id: project_id.into(),
    title: title.into(),
    description: String::new(),
    status,
    priority,
    assignee: assignee.map(String::from),
    start_date: start,
    due_date: due,
    estimated_hours,
    tags: tags.iter().map(|t| t.to_string()).collect(),
    created_at: at(2025, 1, 6, 9),
    updated_at: at(2025, 2, 18, 14),
  }
}

pub fn tasks() -> Vec<Task> {
  use Priority::*;
  use TaskStatus::*;
  vec![
    task(
      "task-1",
      "proj-1",
      "SH010 nebula comp",
      InProgress,
      High,
      Some("Dev Patel"),
      date(2025, 1, 13),
      date(2025, 2, 7),
      Some(80.0),
      &["comp", "hero"],
    ),
    task(
      "task-2",
      "proj-1",
      "SH020 roto for pilot plate",
      Done,
      Medium,
      Some("Lena Sato"),
      date(2025, 1, 13),
      date(2025, 1, 24),
      Some(32.0),
      &["roto"],
    ),
    task(
      "task-3",
      "proj-1",
      "SH030 volumetric lighting",
      Review,
      Urgent,
      Some("Tomas Ruiz"),
      date(2025, 1, 27),
      date(2025, 3, 14),
      Some(120.0),
      &["lighting", "fx"],
    ),
    task(
      "task-4",
      "proj-1",
      "SH040 debris sim",
      Todo,
      High,
      None,
      date(2025, 3, 3),
      None,
      Some(60.0),
      &["fx"],
    ),
    task(
      "task-5",
      "proj-2",
      "EP104 set extension comp",
      Todo,
      Medium,
      Some("Dev Patel"),
      date(2025, 3, 10),
      date(2025, 4, 18),
      None,
      &["comp", "env"],
    ),
    task(
      "task-6",
      "proj-2",
      "EP104 wire removal",
      Blocked,
      Low,
      Some("Lena Sato"),
      date(2025, 3, 17),
      date(2025, 3, 28),
      Some(16.0),
      &["paint"],
    ),
    task(
      "task-7",
      "proj-3",
      "Bottle hero turntable",
      Done,
      Medium,
      Some("Tomas Ruiz"),
      date(2024, 10, 7),
      date(2024, 11, 1),
      Some(40.0),
      &["lookdev"],
    ),
  ]
}

pub fn notifications() -> Vec<Notification> {
  vec![
    Notification {
      id: "notif-1".into(),
      kind: NotificationKind::Assignment,
      title: "You were assigned SH040 debris sim".into(),
      message: "Mara Okafor assigned you a task on Nebula Drift".into(),
      read: false,
      link: Some("/tasks/task-4".into()),
      created_at: at(2025, 2, 19, 10),
      updated_at: at(2025, 2, 19, 10),
    },
    Notification {
      id: "notif-2".into(),
      kind: NotificationKind::StatusChange,
      title: "SH030 moved to review".into(),
      message: "Tomas Ruiz submitted version v014 for review".into(),
      read: false,
      link: Some("/tasks/task-3".into()),
      created_at: at(2025, 2, 20, 15),
      updated_at: at(2025, 2, 20, 15),
    },
    Notification {
      id: "notif-3".into(),
      kind: NotificationKind::Deadline,
      title: "EP104 wire removal due soon".into(),
      message: "Due 2025-03-28, currently blocked".into(),
      read: true,
      link: Some("/tasks/task-6".into()),
      created_at: at(2025, 2, 21, 8),
      updated_at: at(2025, 2, 21, 9),
    },
  ]
}
