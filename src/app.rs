use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{
  patch_from_assignments, DataService, Entity, HttpRemote, ListQuery, MockRemote, Notification,
  Project, Remote, RemoteRequest, SortOrder, Task,
};
use crate::cache::{CacheLayer, CacheStorage, Clock, MemoryStorage, NoopStorage, SystemClock};
use crate::config::Config;
use crate::table::{self, TableModel};
use crate::timeline::{self, layout, today_marker_position, TimelineItem, ViewConfig, ViewMode, ZoomLevel};

/// Entity collections exposed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Collection {
  Projects,
  Tasks,
  Notifications,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List a collection
  List {
    collection: Collection,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    offset: Option<usize>,
    /// Field to sort by (e.g. dueDate)
    #[arg(long)]
    sort_by: Option<String>,
    /// Sort descending
    #[arg(long, requires = "sort_by")]
    desc: bool,
    /// Field filter, repeatable (e.g. --filter status=active)
    #[arg(long = "filter", value_parser = parse_assignment)]
    filters: Vec<(String, String)>,
  },
  /// Show one entity
  Get { collection: Collection, id: String },
  /// Create an entity from field assignments
  Create {
    collection: Collection,
    /// Field value, repeatable (e.g. --set name="Night Shift")
    #[arg(long = "set", value_parser = parse_assignment)]
    fields: Vec<(String, String)>,
  },
  /// Update fields of an entity
  Update {
    collection: Collection,
    id: String,
    #[arg(long = "set", value_parser = parse_assignment, required = true)]
    fields: Vec<(String, String)>,
  },
  /// Search projects and tasks
  Search { term: String },
  /// Mark notifications read
  Read {
    #[arg(required_unless_present = "all")]
    id: Option<String>,
    #[arg(long, conflicts_with = "id")]
    all: bool,
  },
  /// Lay out tasks on a timeline
  Timeline {
    /// Only tasks of this project
    #[arg(long)]
    project: Option<String>,
    /// days, weeks, months or quarters
    #[arg(long)]
    mode: Option<ViewMode>,
    #[arg(long)]
    zoom: Option<f64>,
    /// First visible day (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last visible day (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
  },
  /// Work with markdown tables
  #[command(subcommand)]
  Table(TableCommand),
}

#[derive(Subcommand, Debug)]
pub enum TableCommand {
  /// Print an empty table
  New { rows: usize, cols: usize },
  /// Print a table found in a markdown file
  Show {
    file: PathBuf,
    /// Which table in the file, zero based
    #[arg(long, default_value_t = 0)]
    index: usize,
  },
  /// Reformat every table in a markdown file
  Fmt {
    file: PathBuf,
    /// Rewrite the file instead of printing
    #[arg(short, long)]
    in_place: bool,
  },
  /// Edit a table in a markdown file
  Edit {
    file: PathBuf,
    #[arg(long, default_value_t = 0)]
    index: usize,
    #[arg(short, long)]
    in_place: bool,
    #[command(subcommand)]
    op: TableOp,
  },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TableOp {
  SetCell { row: usize, col: usize, content: String },
  InsertRow {
    at: usize,
    #[arg(long)]
    before: bool,
  },
  InsertCol {
    at: usize,
    #[arg(long)]
    before: bool,
  },
  DeleteRow { at: usize },
  DeleteCol { at: usize },
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
  let (field, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
  let field = field.trim();
  if field.is_empty() {
    return Err(format!("missing field name in '{}'", raw));
  }
  Ok((field.to_string(), value.to_string()))
}

/// Remote selected at startup: the REST endpoint when configured, the
/// in-process mock otherwise.
pub enum Backend {
  Mock(MockRemote),
  Http(HttpRemote),
}

impl Backend {
  pub fn from_config(config: &Config) -> Result<Self> {
    match &config.remote.base_url {
      Some(url) => {
        info!(%url, "using REST backend");
        Ok(Backend::Http(HttpRemote::new(url, Config::api_token())?))
      }
      None => {
        info!("using in-process mock backend");
        let mock = if config.mock.seed {
          MockRemote::seeded()
        } else {
          MockRemote::empty()
        };
        Ok(Backend::Mock(mock.with_latency(
          config.mock.latency_min_ms,
          config.mock.latency_max_ms,
        )))
      }
    }
  }
}

impl Remote for Backend {
  async fn send(&self, request: RemoteRequest) -> crate::error::Result<Value> {
    match self {
      Backend::Mock(remote) => remote.send(request).await,
      Backend::Http(remote) => remote.send(request).await,
    }
  }
}

/// Command runner
pub struct App {
  config: Config,
  service: DataService<Backend>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let backend = Backend::from_config(&config)?;
    Ok(Self::with_backend(config, backend))
  }

  pub fn with_backend(config: Config, backend: Backend) -> Self {
    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      Arc::new(MemoryStorage::new())
    } else {
      debug!("cache disabled");
      Arc::new(NoopStorage)
    };
    let cache = CacheLayer::new(storage).with_timeout(config.remote_timeout());
    let service = DataService::new(backend, cache).with_ttl(config.cache.ttl_policy());
    Self { config, service }
  }

  /// Run one command and return what it prints.
  pub async fn execute(&self, command: Command) -> Result<String> {
    match command {
      Command::List {
        collection,
        limit,
        offset,
        sort_by,
        desc,
        filters,
      } => {
        let mut query = ListQuery::new();
        query.limit = limit;
        query.offset = offset;
        if let Some(field) = sort_by {
          let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
          query = query.sort_by(field, order);
        }
        for (field, value) in filters {
          query = query.filter(field, value);
        }
        match collection {
          Collection::Projects => self.list::<Project>(&query).await,
          Collection::Tasks => self.list::<Task>(&query).await,
          Collection::Notifications => self.list::<Notification>(&query).await,
        }
      }
      Command::Get { collection, id } => match collection {
        Collection::Projects => to_json(&self.service.get::<Project>(&id).await?),
        Collection::Tasks => to_json(&self.service.get::<Task>(&id).await?),
        Collection::Notifications => to_json(&self.service.get::<Notification>(&id).await?),
      },
      Command::Create { collection, fields } => match collection {
        Collection::Projects => self.create::<Project>(&fields).await,
        Collection::Tasks => self.create::<Task>(&fields).await,
        Collection::Notifications => self.create::<Notification>(&fields).await,
      },
      Command::Update {
        collection,
        id,
        fields,
      } => match collection {
        Collection::Projects => self.update::<Project>(&id, &fields).await,
        Collection::Tasks => self.update::<Task>(&id, &fields).await,
        Collection::Notifications => self.update::<Notification>(&id, &fields).await,
      },
      Command::Search { term } => to_json(&self.service.search(&term).await?),
      Command::Read { id, all } => {
        if all {
          let count = self.service.mark_all_notifications_read().await?;
          Ok(format!("Marked {} notification(s) read", count))
        } else {
          let id = id.ok_or_else(|| eyre!("Notification id required"))?;
          to_json(&self.service.mark_notification_read(&id).await?)
        }
      }
      Command::Timeline {
        project,
        mode,
        zoom,
        from,
        to,
      } => self.timeline(project.as_deref(), mode, zoom, from, to).await,
      Command::Table(command) => run_table(command),
    }
  }

  async fn list<T: Entity>(&self, query: &ListQuery) -> Result<String> {
    to_json(&self.service.list::<T>(query).await?)
  }

  async fn create<T: Entity>(&self, fields: &[(String, String)]) -> Result<String> {
    let patch = patch_from_assignments::<T>(fields)?;
    to_json(&self.service.create::<T>(&patch).await?)
  }

  async fn update<T: Entity>(&self, id: &str, fields: &[(String, String)]) -> Result<String> {
    let patch = patch_from_assignments::<T>(fields)?;
    to_json(&self.service.update::<T>(id, &patch).await?)
  }

  async fn timeline(
    &self,
    project: Option<&str>,
    mode: Option<ViewMode>,
    zoom: Option<f64>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
  ) -> Result<String> {
    let settings = &self.config.timeline;
    let mode = mode.unwrap_or(settings.default_mode);
    let zoom = zoom.map(ZoomLevel::new).unwrap_or_else(|| settings.zoom_level());

    let query = ListQuery::new().sort_by("startDate", SortOrder::Asc);
    let page = match project {
      Some(id) => self.service.tasks_for_project(id, &query).await?,
      None => self.service.list::<Task>(&query).await?,
    };
    let items: Vec<TimelineItem> = page.items.iter().map(TimelineItem::from_task).collect();

    let fitted = ViewConfig::fit(&items, mode, zoom);
    let start = from
      .map(timeline::midnight)
      .or(fitted.map(|view| view.range_start));
    let end = to
      .map(|day| timeline::saturating_add(timeline::midnight(day), chrono::Duration::days(1)))
      .or(fitted.map(|view| view.range_end));
    let (Some(start), Some(end)) = (start, end) else {
      return Ok("No tasks to place on the timeline".to_string());
    };
    let view = ViewConfig::new(mode, zoom, start, end);

    let mut out = String::new();
    if let Some(title) = &self.config.title {
      out.push_str(&format!("# {}\n\n", title));
    }
    out.push_str(&format!(
      "{} view, zoom {:.2}, {} to {}, {:.0}px wide\n\n",
      view.mode,
      view.zoom.value(),
      view.range_start.format("%Y-%m-%d"),
      view.range_end.format("%Y-%m-%d"),
      view.total_width()
    ));

    let mut tick_rows = vec![vec!["tick".to_string(), "position".to_string()]];
    for tick in view.ticks() {
      tick_rows.push(vec![tick.label, px(tick.position)]);
    }
    out.push_str(&table::serialize(&TableModel::from_rows(tick_rows)?));
    out.push_str("\n\n");

    let mut bar_rows = vec![vec![
      "row".to_string(),
      "task".to_string(),
      "left".to_string(),
      "width".to_string(),
      "status".to_string(),
      "priority".to_string(),
      "label".to_string(),
    ]];
    for bar in layout(&items, &view, settings.min_bar_width) {
      let placement = if bar.width >= settings.label_min_width {
        "inside"
      } else {
        "outside"
      };
      bar_rows.push(vec![
        bar.row.to_string(),
        format!("{} {}", bar.id, bar.label),
        px(bar.left),
        px(bar.width),
        bar.status,
        bar.priority,
        placement.to_string(),
      ]);
    }
    out.push_str(&table::serialize(&TableModel::from_rows(bar_rows)?));

    let now = SystemClock.now();
    if let Some(marker) = today_marker_position(view.range_start, mode, zoom, now, settings.show_today) {
      if (0.0..=view.total_width()).contains(&marker) {
        out.push_str(&format!("\n\nToday at {}", px(marker)));
      } else {
        out.push_str("\n\nToday is outside the visible range");
      }
    }
    Ok(out)
  }
}

fn px(value: f64) -> String {
  format!("{:.1}px", value)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string_pretty(value)?)
}

fn read_document(path: &Path) -> Result<String> {
  std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read {}: {}", path.display(), e))
}

fn write_document(path: &Path, contents: &str) -> Result<()> {
  std::fs::write(path, contents).map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))
}

fn run_table(command: TableCommand) -> Result<String> {
  match command {
    TableCommand::New { rows, cols } => Ok(table::serialize(&TableModel::empty(rows, cols)?)),
    TableCommand::Show { file, index } => {
      let document = read_document(&file)?;
      let span = table::find_tables(&document)
        .into_iter()
        .nth(index)
        .ok_or_else(|| eyre!("No table #{} in {}", index, file.display()))?;
      let (rows, cols) = span.table.shape();
      Ok(format!(
        "{}\n\n{} row(s) x {} column(s), lines {}-{}",
        table::serialize(&span.table),
        rows,
        cols,
        span.start_line + 1,
        span.end_line
      ))
    }
    TableCommand::Fmt { file, in_place } => {
      let document = read_document(&file)?;
      let formatted = table::format_document(&document);
      if in_place {
        write_document(&file, &formatted)?;
        Ok(format!("Formatted {}", file.display()))
      } else {
        Ok(formatted)
      }
    }
    TableCommand::Edit {
      file,
      index,
      in_place,
      op,
    } => {
      let document = read_document(&file)?;
      let current = table::find_tables(&document)
        .into_iter()
        .nth(index)
        .ok_or_else(|| eyre!("No table #{} in {}", index, file.display()))?
        .table;
      let edited = apply_op(&current, op)?;
      let updated = table::replace_table(&document, index, &edited)
        .ok_or_else(|| eyre!("No table #{} in {}", index, file.display()))?;
      if in_place {
        write_document(&file, &updated)?;
        Ok(table::serialize(&edited))
      } else {
        Ok(updated)
      }
    }
  }
}

fn apply_op(current: &TableModel, op: TableOp) -> Result<TableModel> {
  let edited = match op {
    TableOp::SetCell { row, col, content } => current.update_cell(row, col, content)?,
    TableOp::InsertRow { at, before } => current.insert_row(at, before)?,
    TableOp::InsertCol { at, before } => current.insert_column(at, before)?,
    TableOp::DeleteRow { at } => current.delete_row(at)?,
    TableOp::DeleteCol { at } => current.delete_column(at)?,
  };
  Ok(edited)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::Error;
  use std::io::Write;

  fn app() -> App {
    App::with_backend(Config::default(), Backend::Mock(MockRemote::seeded()))
  }

  fn list(collection: Collection) -> Command {
    Command::List {
      collection,
      limit: None,
      offset: None,
      sort_by: None,
      desc: false,
      filters: Vec::new(),
    }
  }

  #[test]
  fn test_parse_assignment() {
    assert_eq!(
      parse_assignment("status=in_progress").unwrap(),
      ("status".to_string(), "in_progress".to_string())
    );
    assert_eq!(
      parse_assignment("title=a=b").unwrap(),
      ("title".to_string(), "a=b".to_string())
    );
    assert!(parse_assignment("status").is_err());
    assert!(parse_assignment("=x").is_err());
  }

  #[tokio::test]
  async fn test_list_projects_prints_page() {
    let out = app().execute(list(Collection::Projects)).await.unwrap();
    let page: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(page["total"], 3);
    assert!(out.contains("Nebula Drift"));
  }

  #[tokio::test]
  async fn test_list_rejects_unknown_filter() {
    let command = Command::List {
      collection: Collection::Tasks,
      limit: None,
      offset: None,
      sort_by: None,
      desc: false,
      filters: vec![("color".to_string(), "red".to_string())],
    };
    let err = app().execute(command).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
  }

  #[tokio::test]
  async fn test_get_missing_is_not_found() {
    let command = Command::Get {
      collection: Collection::Projects,
      id: "proj-404".to_string(),
    };
    let err = app().execute(command).await.unwrap_err();
    assert!(err
      .downcast_ref::<Error>()
      .is_some_and(Error::is_not_found));
  }

  #[tokio::test]
  async fn test_create_then_list_sees_new_entity() {
    let app = app();
    let before = app.execute(list(Collection::Projects)).await.unwrap();
    assert!(!before.contains("Night Shift"));

    let created = app
      .execute(Command::Create {
        collection: Collection::Projects,
        fields: vec![("name".to_string(), "Night Shift".to_string())],
      })
      .await
      .unwrap();
    assert!(created.contains("Night Shift"));

    let after = app.execute(list(Collection::Projects)).await.unwrap();
    assert!(after.contains("Night Shift"));
  }

  #[tokio::test]
  async fn test_read_all_notifications() {
    let out = app()
      .execute(Command::Read { id: None, all: true })
      .await
      .unwrap();
    assert_eq!(out, "Marked 2 notification(s) read");
  }

  #[tokio::test]
  async fn test_timeline_lists_project_tasks() {
    let out = app()
      .execute(Command::Timeline {
        project: Some("proj-2".to_string()),
        mode: Some(ViewMode::Days),
        zoom: None,
        from: None,
        to: None,
      })
      .await
      .unwrap();
    assert!(out.starts_with("days view"));
    assert!(out.contains("task-5"));
    assert!(out.contains("task-6"));
    assert!(!out.contains("task-1 "));
  }

  #[tokio::test]
  async fn test_timeline_without_tasks() {
    let app = App::with_backend(Config::default(), Backend::Mock(MockRemote::empty()));
    let out = app
      .execute(Command::Timeline {
        project: None,
        mode: None,
        zoom: None,
        from: None,
        to: None,
      })
      .await
      .unwrap();
    assert_eq!(out, "No tasks to place on the timeline");
  }

  #[test]
  fn test_table_new() {
    let out = run_table(TableCommand::New { rows: 2, cols: 2 }).unwrap();
    assert_eq!(out, "| Header 1 | Header 2 |\n| -------- | -------- |\n|          |          |");
    assert!(run_table(TableCommand::New { rows: 0, cols: 2 }).is_err());
  }

  #[test]
  fn test_table_edit_in_place() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "Shots\n\n|a|b|\n|-|-|\n|1|2|\n").unwrap();

    run_table(TableCommand::Edit {
      file: file.path().to_path_buf(),
      index: 0,
      in_place: true,
      op: TableOp::SetCell {
        row: 1,
        col: 1,
        content: "SH010".to_string(),
      },
    })
    .unwrap();

    let written = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(
      written,
      "Shots\n\n| a   | b     |\n| --- | ----- |\n| 1   | SH010 |\n"
    );
  }

  #[test]
  fn test_table_edit_out_of_range() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "|a|\n|-|").unwrap();
    let err = run_table(TableCommand::Edit {
      file: file.path().to_path_buf(),
      index: 0,
      in_place: false,
      op: TableOp::DeleteRow { at: 0 },
    })
    .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<Error>(),
      Some(Error::InvalidOperation(_))
    ));
  }

  #[test]
  fn test_table_show_missing_index() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "no tables here").unwrap();
    assert!(run_table(TableCommand::Show {
      file: file.path().to_path_buf(),
      index: 0,
    })
    .is_err());
  }
}
