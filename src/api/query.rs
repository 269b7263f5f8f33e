//! List queries: validation, filtering, sorting, pagination and cache keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

use super::entity::{Entity, FieldValue};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  #[default]
  Asc,
  Desc,
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }

  fn parse(raw: &str) -> Result<Self> {
    match raw.to_lowercase().as_str() {
      "asc" => Ok(SortOrder::Asc),
      "desc" => Ok(SortOrder::Desc),
      _ => Err(Error::Validation(format!("invalid sort order '{}'", raw))),
    }
  }
}

/// Options for listing a collection.
///
/// Filters are kept as raw strings (as they travel over the wire) and typed
/// against the entity's field table when validated or applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
  pub limit: Option<usize>,
  pub offset: Option<usize>,
  pub sort_by: Option<String>,
  pub sort_order: Option<SortOrder>,
  pub filters: BTreeMap<String, String>,
}

impl ListQuery {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn offset(mut self, offset: usize) -> Self {
    self.offset = Some(offset);
    self
  }

  pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
    self.sort_by = Some(field.into());
    self.sort_order = Some(order);
    self
  }

  pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.insert(field.into(), value.into());
    self
  }

  /// Check the query against `T`'s fields without touching any data.
  pub fn validate<T: Entity>(&self) -> Result<()> {
    if self.limit == Some(0) {
      return Err(Error::Validation("limit must be greater than zero".into()));
    }
    if let Some(field) = &self.sort_by {
      if T::field_kind(field).is_none() {
        return Err(Error::Validation(format!(
          "cannot sort {} by unknown field '{}'",
          T::COLLECTION,
          field
        )));
      }
    }
    self.typed_filters::<T>().map(|_| ())
  }

  fn typed_filters<T: Entity>(&self) -> Result<Vec<(&str, FieldValue)>> {
    self
      .filters
      .iter()
      .map(|(field, raw)| {
        let kind = T::field_kind(field).ok_or_else(|| {
          Error::Validation(format!(
            "cannot filter {} by unknown field '{}'",
            T::COLLECTION,
            field
          ))
        })?;
        Ok((field.as_str(), kind.parse_filter(field, raw)?))
      })
      .collect()
  }

  /// Wire parameters in canonical order: paging, sorting, then filters.
  pub fn params(&self) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(limit) = self.limit {
      params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = self.offset {
      params.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(sort_by) = &self.sort_by {
      params.push(("sortBy".to_string(), sort_by.clone()));
    }
    if let Some(order) = self.sort_order {
      params.push(("sortOrder".to_string(), order.as_str().to_string()));
    }
    for (field, value) in &self.filters {
      params.push((field.clone(), value.clone()));
    }
    params
  }

  /// Rebuild a query from wire parameters.
  pub fn from_params(params: &[(String, String)]) -> Result<Self> {
    let mut query = ListQuery::new();
    for (name, value) in params {
      match name.as_str() {
        "limit" => query.limit = Some(parse_count(name, value)?),
        "offset" => query.offset = Some(parse_count(name, value)?),
        "sortBy" => query.sort_by = Some(value.clone()),
        "sortOrder" => query.sort_order = Some(SortOrder::parse(value)?),
        _ => {
          query.filters.insert(name.clone(), value.clone());
        }
      }
    }
    Ok(query)
  }

  /// Cache key for listing `path` with this query, e.g.
  /// `/projects?limit=10&offset=0&sortBy=name&sortOrder=asc`.
  ///
  /// Names and values are form-encoded, so distinct queries never share a key.
  pub fn cache_key(&self, path: &str) -> String {
    let params = self.params();
    if params.is_empty() {
      return path.to_string();
    }
    let query = form_urlencoded::Serializer::new(String::new())
      .extend_pairs(params.iter())
      .finish();
    format!("{}?{}", path, query)
  }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
  value
    .parse()
    .map_err(|_| Error::Validation(format!("{} must be a non-negative integer, got '{}'", name, value)))
}

/// One page of a filtered, sorted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Number of items matching the filters, across all pages
  pub total: usize,
  /// 1-based
  pub page: usize,
  pub page_size: usize,
  pub has_more: bool,
}

/// Filter, stable-sort and paginate `items`.
pub fn apply<T: Entity>(items: Vec<T>, query: &ListQuery) -> Result<Page<T>> {
  query.validate::<T>()?;
  let filters = query.typed_filters::<T>()?;

  let mut matching: Vec<T> = items
    .into_iter()
    .filter(|item| {
      filters
        .iter()
        .all(|(field, expected)| item.field(field).matches(expected))
    })
    .collect();

  if let Some(field) = &query.sort_by {
    let order = query.sort_order.unwrap_or_default();
    // sort_by is stable, so ties keep their original order in both directions
    matching.sort_by(|a, b| {
      let (a, b) = (a.field(field), b.field(field));
      match (&a, &b) {
        (FieldValue::Missing, _) | (_, FieldValue::Missing) => a.compare(&b),
        _ if order == SortOrder::Desc => b.compare(&a),
        _ => a.compare(&b),
      }
    });
  }

  let total = matching.len();
  let offset = query.offset.unwrap_or(0);
  let page_size = query.limit.unwrap_or(total).max(1);
  let items: Vec<T> = matching.into_iter().skip(offset).take(page_size).collect();

  Ok(Page {
    items,
    total,
    page: offset / page_size + 1,
    page_size,
    has_more: offset + page_size < total,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{Priority, Task, TaskStatus};

  fn task(id: &str, title: &str, status: TaskStatus, priority: Priority) -> Task {
    Task {
      id: id.to_string(),
      project_id: "proj-1".to_string(),
      title: title.to_string(),
      status,
      priority,
      ..Task::template()
    }
  }

  fn tasks() -> Vec<Task> {
    vec![
      task("task-1", "SH010 comp", TaskStatus::Done, Priority::High),
      task("task-2", "SH020 roto", TaskStatus::Todo, Priority::Low),
      task("task-3", "SH030 comp", TaskStatus::InProgress, Priority::High),
      task("task-4", "SH040 lighting", TaskStatus::Todo, Priority::Urgent),
      task("task-5", "SH050 Comp", TaskStatus::Review, Priority::Medium),
    ]
  }

  fn ids(page: &Page<Task>) -> Vec<&str> {
    page.items.iter().map(|t| t.id.as_str()).collect()
  }

  #[test]
  fn test_pagination_invariant() {
    let total = tasks().len();
    for limit in 1..=6 {
      for offset in 0..=7 {
        let query = ListQuery::new().limit(limit).offset(offset);
        let page = apply(tasks(), &query).unwrap();
        assert_eq!(page.items.len(), limit.min(total.saturating_sub(offset)));
        assert_eq!(page.has_more, offset + limit < total);
        assert_eq!(page.total, total);
        assert!(page.items.len() <= page.page_size);
      }
    }
  }

  #[test]
  fn test_unlimited_query_returns_everything() {
    let page = apply(tasks(), &ListQuery::new()).unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 5);
    assert!(!page.has_more);
  }

  #[test]
  fn test_page_number() {
    let page = apply(tasks(), &ListQuery::new().limit(2).offset(2)).unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(ids(&page), vec!["task-3", "task-4"]);
  }

  #[test]
  fn test_text_filter_is_case_insensitive_substring() {
    let page = apply(tasks(), &ListQuery::new().filter("title", "COMP")).unwrap();
    assert_eq!(ids(&page), vec!["task-1", "task-3", "task-5"]);
  }

  #[test]
  fn test_non_text_filter_is_equality() {
    let page = apply(
      tasks(),
      &ListQuery::new().filter("status", "todo").filter("priority", "urgent"),
    )
    .unwrap();
    assert_eq!(ids(&page), vec!["task-4"]);
  }

  #[test]
  fn test_stable_sort_both_directions() {
    let asc = apply(tasks(), &ListQuery::new().sort_by("priority", SortOrder::Asc)).unwrap();
    assert_eq!(ids(&asc), vec!["task-2", "task-5", "task-1", "task-3", "task-4"]);

    let desc = apply(tasks(), &ListQuery::new().sort_by("priority", SortOrder::Desc)).unwrap();
    assert_eq!(ids(&desc), vec!["task-4", "task-1", "task-3", "task-5", "task-2"]);
  }

  #[test]
  fn test_missing_values_sort_last() {
    let mut items = tasks();
    items[0].assignee = Some("zoe".into());
    items[3].assignee = Some("Adam".into());
    let page = apply(items, &ListQuery::new().sort_by("assignee", SortOrder::Desc)).unwrap();
    assert_eq!(&ids(&page)[..2], &["task-1", "task-4"]);
  }

  #[test]
  fn test_validation_errors() {
    let zero = ListQuery::new().limit(0);
    assert!(matches!(zero.validate::<Task>(), Err(Error::Validation(_))));

    let bad_sort = ListQuery::new().sort_by("budget", SortOrder::Asc);
    assert!(matches!(bad_sort.validate::<Task>(), Err(Error::Validation(_))));

    let bad_filter = ListQuery::new().filter("status", "finished");
    assert!(matches!(apply(tasks(), &bad_filter), Err(Error::Validation(_))));
  }

  #[test]
  fn test_cache_key_and_params_round_trip() {
    let query = ListQuery::new()
      .limit(10)
      .offset(0)
      .sort_by("name", SortOrder::Asc)
      .filter("status", "active");
    assert_eq!(
      query.cache_key("/projects"),
      "/projects?limit=10&offset=0&sortBy=name&sortOrder=asc&status=active"
    );
    assert_eq!(ListQuery::from_params(&query.params()).unwrap(), query);
    assert_eq!(ListQuery::new().cache_key("/projects"), "/projects");
  }

  #[test]
  fn test_cache_key_encodes_separators() {
    let smuggled = ListQuery::new().filter("description", "&title=comp");
    let split = ListQuery::new().filter("description", "").filter("title", "comp");
    assert_ne!(smuggled.cache_key("/tasks"), split.cache_key("/tasks"));
    assert_eq!(
      smuggled.cache_key("/tasks"),
      "/tasks?description=%26title%3Dcomp"
    );
  }

  #[test]
  fn test_from_params_rejects_negative_limit() {
    let params = vec![("limit".to_string(), "-5".to_string())];
    assert!(matches!(
      ListQuery::from_params(&params),
      Err(Error::Validation(_))
    ));
  }
}
