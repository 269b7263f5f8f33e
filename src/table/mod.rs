//! Markdown table model for wiki pages.
//!
//! `TableModel` is a value: every edit returns a new table and leaves the
//! original untouched. Row 0 is rendered as the header but the model treats it
//! like any other row. All rows always have the same number of cells.

mod markdown;

use serde::Serialize;

use crate::error::{Error, Result};

pub use markdown::{find_tables, format_document, parse, replace_table, serialize, TableSpan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
  pub id: u64,
  pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
  pub id: u64,
  pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableModel {
  rows: Vec<Row>,
  #[serde(skip)]
  next_id: u64,
}

impl TableModel {
  /// A `rows` x `cols` table with `Header N` titles and empty body cells.
  pub fn empty(rows: usize, cols: usize) -> Result<Self> {
    if rows == 0 || cols == 0 {
      return Err(Error::InvalidOperation(format!(
        "a table needs at least one row and one column, got {}x{}",
        rows, cols
      )));
    }
    let contents = (0..rows)
      .map(|r| {
        (0..cols)
          .map(|c| {
            if r == 0 {
              format!("Header {}", c + 1)
            } else {
              String::new()
            }
          })
          .collect()
      })
      .collect();
    Ok(Self::from_contents(contents))
  }

  /// Table from cell text. Row 0 sets the width; other rows are padded or
  /// truncated to match.
  pub fn from_rows(rows: Vec<Vec<String>>) -> Result<Self> {
    if rows.first().map_or(true, Vec::is_empty) {
      return Err(Error::InvalidOperation(
        "a table needs at least one row and one column".into(),
      ));
    }
    Ok(Self::from_contents(rows))
  }

  /// Build a table from cell text, padding or truncating every row to the
  /// width of the first. Callers guarantee at least one non-empty row.
  fn from_contents(contents: Vec<Vec<String>>) -> Self {
    let width = contents.first().map(Vec::len).unwrap_or(0);
    let mut table = TableModel {
      rows: Vec::with_capacity(contents.len()),
      next_id: 0,
    };
    for mut cells in contents {
      cells.resize(width, String::new());
      let row = table.new_row(cells);
      table.rows.push(row);
    }
    table
  }

  fn fresh_id(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }

  fn new_cell(&mut self, content: String) -> Cell {
    Cell {
      id: self.fresh_id(),
      content: normalize(content),
    }
  }

  fn new_row(&mut self, contents: Vec<String>) -> Row {
    let cells = contents.into_iter().map(|c| self.new_cell(c)).collect();
    Row {
      id: self.fresh_id(),
      cells,
    }
  }

  pub fn rows(&self) -> &[Row] {
    &self.rows
  }

  pub fn row_count(&self) -> usize {
    self.rows.len()
  }

  pub fn column_count(&self) -> usize {
    self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
  }

  /// (rows, columns)
  pub fn shape(&self) -> (usize, usize) {
    (self.row_count(), self.column_count())
  }

  pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
    self
      .rows
      .get(row)
      .and_then(|r| r.cells.get(col))
      .map(|c| c.content.as_str())
  }

  /// Cell text, row by row.
  pub fn contents(&self) -> Vec<Vec<String>> {
    self
      .rows
      .iter()
      .map(|r| r.cells.iter().map(|c| c.content.clone()).collect())
      .collect()
  }

  pub fn update_cell(&self, row: usize, col: usize, content: impl Into<String>) -> Result<Self> {
    let mut table = self.clone();
    let cell = table
      .rows
      .get_mut(row)
      .and_then(|r| r.cells.get_mut(col))
      .ok_or(Error::Index { row, col })?;
    cell.content = normalize(content.into());
    Ok(table)
  }

  /// Insert a blank row next to `at`.
  pub fn insert_row(&self, at: usize, before: bool) -> Result<Self> {
    if at >= self.row_count() {
      return Err(Error::Index { row: at, col: 0 });
    }
    let mut table = self.clone();
    let blank = vec![String::new(); table.column_count()];
    let row = table.new_row(blank);
    let index = if before { at } else { at + 1 };
    table.rows.insert(index, row);
    Ok(table)
  }

  /// Insert a blank cell into every row next to column `at`.
  pub fn insert_column(&self, at: usize, before: bool) -> Result<Self> {
    if at >= self.column_count() {
      return Err(Error::Index { row: 0, col: at });
    }
    let mut table = self.clone();
    let index = if before { at } else { at + 1 };
    for r in 0..table.rows.len() {
      let cell = table.new_cell(String::new());
      table.rows[r].cells.insert(index, cell);
    }
    Ok(table)
  }

  pub fn delete_row(&self, index: usize) -> Result<Self> {
    if self.row_count() <= 1 {
      return Err(Error::InvalidOperation(
        "cannot delete the only row of a table".into(),
      ));
    }
    if index >= self.row_count() {
      return Err(Error::Index { row: index, col: 0 });
    }
    let mut table = self.clone();
    table.rows.remove(index);
    Ok(table)
  }

  pub fn delete_column(&self, index: usize) -> Result<Self> {
    if self.column_count() <= 1 {
      return Err(Error::InvalidOperation(
        "cannot delete the only column of a table".into(),
      ));
    }
    if index >= self.column_count() {
      return Err(Error::Index { row: 0, col: index });
    }
    let mut table = self.clone();
    for row in &mut table.rows {
      row.cells.remove(index);
    }
    Ok(table)
  }
}

/// Cells never start or end with whitespace. Pipe tables pad cells with
/// spaces, so edge whitespace could not survive a render and parse.
fn normalize(content: String) -> String {
  let trimmed = content.trim();
  if trimmed.len() == content.len() {
    content
  } else {
    trimmed.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn is_rectangular(table: &TableModel) -> bool {
    let cols = table.column_count();
    table.rows().iter().all(|r| r.cells.len() == cols)
  }

  #[test]
  fn test_empty_table_placeholders() {
    let table = TableModel::empty(3, 2).unwrap();
    assert_eq!(table.shape(), (3, 2));
    assert_eq!(table.cell(0, 1), Some("Header 2"));
    assert_eq!(table.cell(2, 0), Some(""));
  }

  #[test]
  fn test_empty_rejects_zero_dimensions() {
    assert!(matches!(TableModel::empty(0, 2), Err(Error::InvalidOperation(_))));
    assert!(matches!(TableModel::empty(2, 0), Err(Error::InvalidOperation(_))));
  }

  #[test]
  fn test_from_rows_normalizes_width() {
    let rows = vec![
      vec!["id".to_string(), "left".to_string()],
      vec!["task-1".to_string()],
    ];
    let table = TableModel::from_rows(rows).unwrap();
    assert_eq!(table.shape(), (2, 2));
    assert_eq!(table.cell(1, 1), Some(""));
    assert!(matches!(TableModel::from_rows(Vec::new()), Err(Error::InvalidOperation(_))));
  }

  #[test]
  fn test_update_cell_returns_new_table() {
    let table = TableModel::empty(2, 2).unwrap();
    let edited = table.update_cell(1, 1, "SH010").unwrap();
    assert_eq!(edited.cell(1, 1), Some("SH010"));
    assert_eq!(table.cell(1, 1), Some(""));
  }

  #[test]
  fn test_update_cell_trims_edge_whitespace() {
    let table = TableModel::empty(2, 1).unwrap();
    let edited = table.update_cell(1, 0, "  indented\n").unwrap();
    assert_eq!(edited.cell(1, 0), Some("indented"));
    let inner = table.update_cell(1, 0, "a  \n  b").unwrap();
    assert_eq!(inner.cell(1, 0), Some("a  \n  b"));
  }

  #[test]
  fn test_update_cell_out_of_range() {
    let table = TableModel::empty(2, 2).unwrap();
    assert!(matches!(
      table.update_cell(2, 0, "x"),
      Err(Error::Index { row: 2, col: 0 })
    ));
    assert!(matches!(
      table.update_cell(0, 5, "x"),
      Err(Error::Index { row: 0, col: 5 })
    ));
  }

  #[test]
  fn test_insert_row_before_and_after() {
    let table = TableModel::empty(2, 2)
      .unwrap()
      .update_cell(1, 0, "body")
      .unwrap();

    let after = table.insert_row(0, false).unwrap();
    assert_eq!(after.shape(), (3, 2));
    assert_eq!(after.cell(1, 0), Some(""));
    assert_eq!(after.cell(2, 0), Some("body"));

    let before = table.insert_row(1, true).unwrap();
    assert_eq!(before.cell(1, 0), Some(""));
    assert_eq!(before.cell(2, 0), Some("body"));

    assert!(matches!(table.insert_row(2, true), Err(Error::Index { .. })));
  }

  #[test]
  fn test_insert_column_keeps_rectangle() {
    let table = TableModel::empty(3, 2).unwrap();
    let wider = table.insert_column(0, true).unwrap();
    assert_eq!(wider.shape(), (3, 3));
    assert!(is_rectangular(&wider));
    assert_eq!(wider.cell(0, 0), Some(""));
    assert_eq!(wider.cell(0, 1), Some("Header 1"));

    let last = table.insert_column(1, false).unwrap();
    assert_eq!(last.cell(0, 2), Some(""));
  }

  #[test]
  fn test_structural_edits_preserve_rectangularity() {
    let mut table = TableModel::empty(2, 2).unwrap();
    table = table.insert_row(1, false).unwrap();
    table = table.insert_column(1, true).unwrap();
    table = table.delete_row(0).unwrap();
    table = table.insert_column(2, false).unwrap();
    table = table.delete_column(1).unwrap();
    assert_eq!(table.shape(), (2, 3));
    assert!(is_rectangular(&table));
  }

  #[test]
  fn test_deletion_floor() {
    let one_row = TableModel::empty(1, 3).unwrap();
    assert!(matches!(one_row.delete_row(0), Err(Error::InvalidOperation(_))));

    let one_col = TableModel::empty(3, 1).unwrap();
    assert!(matches!(one_col.delete_column(0), Err(Error::InvalidOperation(_))));

    let table = TableModel::empty(2, 2).unwrap();
    assert!(matches!(table.delete_row(2), Err(Error::Index { .. })));
    assert!(matches!(table.delete_column(2), Err(Error::Index { .. })));
  }

  #[test]
  fn test_new_cells_get_unique_ids() {
    let table = TableModel::empty(2, 2).unwrap().insert_column(0, false).unwrap();
    let mut ids: Vec<u64> = table
      .rows()
      .iter()
      .flat_map(|r| r.cells.iter().map(|c| c.id))
      .collect();
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
  }
}
