//! Field-level access to entities for filtering, sorting and patch building.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Trait for entities served by the data service.
///
/// Implementors describe their queryable fields so list queries can be
/// validated and applied without knowing the concrete type.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Partial update payload; every field optional.
  type Patch: Clone + Default + Serialize + DeserializeOwned + Send + Sync;

  /// Endpoint path segment (e.g., "projects")
  const COLLECTION: &'static str;
  /// Singular name used in errors (e.g., "project")
  const KIND: &'static str;
  /// Prefix for synthesized ids
  const ID_PREFIX: &'static str;
  /// Queryable fields by their JSON name
  const FIELDS: &'static [(&'static str, FieldKind)];

  fn id(&self) -> &str;

  /// Value of a field listed in `FIELDS`; anything else is `Missing`.
  fn field(&self, name: &str) -> FieldValue;

  /// Defaults that a create request is merged over.
  fn template() -> Self;

  fn field_kind(name: &str) -> Option<FieldKind> {
    Self::FIELDS
      .iter()
      .find(|(field, _)| *field == name)
      .map(|(_, kind)| *kind)
  }

  /// Case-insensitive free-text match over the text fields.
  fn matches_term(&self, term: &str) -> bool {
    let needle = FieldValue::Text(term.to_string());
    Self::FIELDS
      .iter()
      .filter(|(_, kind)| matches!(kind, FieldKind::Text))
      .any(|(name, _)| self.field(name).matches(&needle))
  }
}

/// How a field is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  /// Free text, substring-matched
  Text,
  /// List of short strings, substring-matched per element
  List,
  /// Identifier or reference, exact match
  Key,
  /// Enumerated value; names listed in sort order
  Ordinal(&'static [&'static str]),
  Number,
  Flag,
  Date,
  Timestamp,
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Text(String),
  List(Vec<String>),
  Key(String),
  Ordinal { rank: usize, name: String },
  Number(f64),
  Flag(bool),
  Date(NaiveDate),
  Timestamp(DateTime<Utc>),
  Missing,
}

impl FieldValue {
  /// Build an ordinal from one of the kind's names.
  pub fn ordinal(names: &[&str], name: &str) -> Self {
    match names.iter().position(|n| *n == name) {
      Some(rank) => FieldValue::Ordinal {
        rank,
        name: name.to_string(),
      },
      None => FieldValue::Missing,
    }
  }

  /// Whether this (entity) value satisfies a filter value.
  ///
  /// Text is matched as a case-insensitive substring, everything else by
  /// equality.
  pub fn matches(&self, expected: &FieldValue) -> bool {
    match (self, expected) {
      (FieldValue::Text(hay), FieldValue::Text(needle)) => contains_ci(hay, needle),
      (FieldValue::List(items), FieldValue::Text(needle)) => {
        items.iter().any(|item| contains_ci(item, needle))
      }
      (FieldValue::Ordinal { name: a, .. }, FieldValue::Ordinal { name: b, .. }) => {
        a.eq_ignore_ascii_case(b)
      }
      (FieldValue::Missing, _) => false,
      (actual, expected) => actual == expected,
    }
  }

  /// Ordering for sorting. `Missing` sorts after every present value.
  pub fn compare(&self, other: &FieldValue) -> Ordering {
    use FieldValue::*;
    match (self, other) {
      (Missing, Missing) => Ordering::Equal,
      (Missing, _) => Ordering::Greater,
      (_, Missing) => Ordering::Less,
      (Text(a), Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
      (List(a), List(b)) => a.cmp(b),
      (Key(a), Key(b)) => a.cmp(b),
      (Ordinal { rank: a, .. }, Ordinal { rank: b, .. }) => a.cmp(b),
      (Number(a), Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
      (Flag(a), Flag(b)) => a.cmp(b),
      (Date(a), Date(b)) => a.cmp(b),
      (Timestamp(a), Timestamp(b)) => a.cmp(b),
      _ => Ordering::Equal,
    }
  }
}

fn contains_ci(hay: &str, needle: &str) -> bool {
  hay.to_lowercase().contains(&needle.to_lowercase())
}

impl FieldKind {
  /// Parse a raw filter value for a field of this kind.
  pub fn parse_filter(&self, field: &str, raw: &str) -> Result<FieldValue> {
    let invalid = || Error::Validation(format!("invalid value '{}' for field '{}'", raw, field));
    match self {
      FieldKind::Text | FieldKind::List => Ok(FieldValue::Text(raw.to_string())),
      FieldKind::Key => Ok(FieldValue::Key(raw.to_string())),
      FieldKind::Ordinal(names) => {
        let lowered = raw.to_lowercase();
        match FieldValue::ordinal(names, &lowered) {
          FieldValue::Missing => Err(Error::Validation(format!(
            "invalid value '{}' for field '{}' (expected one of: {})",
            raw,
            field,
            names.join(", ")
          ))),
          value => Ok(value),
        }
      }
      FieldKind::Number => raw.parse().map(FieldValue::Number).map_err(|_| invalid()),
      FieldKind::Flag => raw.parse().map(FieldValue::Flag).map_err(|_| invalid()),
      FieldKind::Date => raw.parse().map(FieldValue::Date).map_err(|_| invalid()),
      FieldKind::Timestamp => raw
        .parse::<DateTime<Utc>>()
        .map(FieldValue::Timestamp)
        .map_err(|_| invalid()),
    }
  }

  /// Convert a raw `field=value` assignment into the JSON a patch expects.
  pub fn to_json(&self, field: &str, raw: &str) -> Result<Value> {
    Ok(match self.parse_filter(field, raw)? {
      FieldValue::Number(n) => {
        if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
          Value::from(n as i64)
        } else {
          Value::from(n)
        }
      }
      FieldValue::Flag(b) => Value::Bool(b),
      FieldValue::Ordinal { name, .. } => Value::String(name),
      _ if matches!(self, FieldKind::List) => Value::Array(
        raw
          .split(',')
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .map(|s| Value::String(s.to_string()))
          .collect(),
      ),
      _ => Value::String(raw.to_string()),
    })
  }
}

/// Build a typed patch from `field=value` assignments.
pub fn patch_from_assignments<T: Entity>(assignments: &[(String, String)]) -> Result<T::Patch> {
  let mut object = serde_json::Map::new();
  for (field, raw) in assignments {
    let kind = T::field_kind(field).ok_or_else(|| {
      Error::Validation(format!("unknown field '{}' for {}", field, T::KIND))
    })?;
    object.insert(field.clone(), kind.to_json(field, raw)?);
  }
  serde_json::from_value(Value::Object(object))
    .map_err(|e| Error::Validation(format!("invalid {} fields: {}", T::KIND, e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

  #[test]
  fn test_text_matches_substring_case_insensitive() {
    let value = FieldValue::Text("Comp: SH010 beauty".into());
    assert!(value.matches(&FieldValue::Text("sh010".into())));
    assert!(!value.matches(&FieldValue::Text("sh020".into())));
  }

  #[test]
  fn test_key_requires_equality() {
    let value = FieldValue::Key("proj-10".into());
    assert!(!value.matches(&FieldValue::Key("proj-1".into())));
    assert!(value.matches(&FieldValue::Key("proj-10".into())));
  }

  #[test]
  fn test_ordinal_sorts_by_rank() {
    let low = FieldValue::ordinal(PRIORITIES, "low");
    let urgent = FieldValue::ordinal(PRIORITIES, "urgent");
    assert_eq!(low.compare(&urgent), Ordering::Less);
    assert_eq!(FieldValue::Missing.compare(&low), Ordering::Greater);
  }

  #[test]
  fn test_parse_filter_rejects_unknown_ordinal() {
    let kind = FieldKind::Ordinal(PRIORITIES);
    assert!(kind.parse_filter("priority", "HIGH").is_ok());
    assert!(matches!(
      kind.parse_filter("priority", "critical"),
      Err(Error::Validation(_))
    ));
    assert!(FieldKind::Number.parse_filter("progress", "abc").is_err());
  }

  #[test]
  fn test_to_json_shapes() {
    assert_eq!(FieldKind::Number.to_json("progress", "40").unwrap(), Value::from(40));
    assert_eq!(FieldKind::Number.to_json("hours", "1.5").unwrap(), Value::from(1.5));
    assert_eq!(FieldKind::Flag.to_json("read", "true").unwrap(), Value::Bool(true));
    assert_eq!(
      FieldKind::List.to_json("tags", "comp, fx").unwrap(),
      serde_json::json!(["comp", "fx"])
    );
  }
}
