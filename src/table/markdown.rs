//! Parsing and rendering of pipe tables.
//!
//! Input is lenient: leading and trailing pipes are optional, alignment
//! colons in the separator row are accepted and dropped, and ragged body rows
//! are padded or truncated to the header width. Output is always the padded
//! form with a pipe at both ends.

use serde::Serialize;

use super::TableModel;

/// A table found inside a larger document.
#[derive(Debug, Clone, Serialize)]
pub struct TableSpan {
  /// First line of the header row, zero based
  pub start_line: usize,
  /// One past the last body row
  pub end_line: usize,
  pub table: TableModel,
}

/// Parse the first table in `markdown`. Text without a header row followed
/// by a separator row yields `None`.
pub fn parse(markdown: &str) -> Option<TableModel> {
  find_tables(markdown).into_iter().next().map(|span| span.table)
}

/// Every table in `document`, in order. Tables inside fenced code blocks are
/// skipped.
pub fn find_tables(document: &str) -> Vec<TableSpan> {
  let lines: Vec<&str> = document.lines().collect();
  let mut spans = Vec::new();
  let mut in_fence = false;
  let mut i = 0;

  while i < lines.len() {
    let line = lines[i];
    if is_fence(line) {
      in_fence = !in_fence;
      i += 1;
      continue;
    }
    if in_fence || !is_row(line) {
      i += 1;
      continue;
    }

    let header = split_row(line);
    let separated = lines
      .get(i + 1)
      .is_some_and(|next| is_separator(next, header.len()));
    if !separated {
      i += 1;
      continue;
    }

    let mut rows = vec![header];
    let mut end = i + 2;
    while end < lines.len() && is_row(lines[end]) && !is_fence(lines[end]) {
      rows.push(split_row(lines[end]));
      end += 1;
    }

    spans.push(TableSpan {
      start_line: i,
      end_line: end,
      table: TableModel::from_contents(rows),
    });
    i = end;
  }

  spans
}

/// Render `table` as a padded pipe table without a trailing newline.
///
/// Every column is as wide as its widest cell and never narrower than three
/// characters, so the separator row always carries at least `---`.
pub fn serialize(table: &TableModel) -> String {
  let rows: Vec<Vec<String>> = table
    .contents()
    .iter()
    .map(|row| row.iter().map(|cell| escape(cell)).collect())
    .collect();

  let mut widths = vec![3usize; table.column_count()];
  for row in &rows {
    for (col, cell) in row.iter().enumerate() {
      widths[col] = widths[col].max(cell.chars().count());
    }
  }

  let mut lines = Vec::with_capacity(rows.len() + 1);
  for (index, row) in rows.iter().enumerate() {
    lines.push(render_row(row.iter().map(String::as_str), &widths));
    if index == 0 {
      let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
      lines.push(render_row(dashes.iter().map(String::as_str), &widths));
    }
  }
  lines.join("\n")
}

/// Replace the `index`th table of `document` with `table`. Returns `None`
/// when the document has fewer tables.
pub fn replace_table(document: &str, index: usize, table: &TableModel) -> Option<String> {
  let span = find_tables(document).into_iter().nth(index)?;
  Some(splice(document, &[(span.start_line, span.end_line, serialize(table))]))
}

/// Re-render every table in `document` in canonical form. Other lines are
/// left alone.
pub fn format_document(document: &str) -> String {
  let edits: Vec<(usize, usize, String)> = find_tables(document)
    .into_iter()
    .map(|span| (span.start_line, span.end_line, serialize(&span.table)))
    .collect();
  splice(document, &edits)
}

/// Swap line ranges of `document` for new text. `edits` must be sorted and
/// non-overlapping.
fn splice(document: &str, edits: &[(usize, usize, String)]) -> String {
  let lines: Vec<&str> = document.lines().collect();
  let mut out: Vec<&str> = Vec::with_capacity(lines.len());
  let mut cursor = 0;
  for (start, end, text) in edits {
    out.extend_from_slice(&lines[cursor..*start]);
    out.push(text.as_str());
    cursor = *end;
  }
  out.extend_from_slice(&lines[cursor..]);

  let mut result = out.join("\n");
  if document.ends_with('\n') {
    result.push('\n');
  }
  result
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
  let padded: Vec<String> = cells
    .zip(widths)
    .map(|(cell, width)| {
      let pad = width.saturating_sub(cell.chars().count());
      format!("{}{}", cell, " ".repeat(pad))
    })
    .collect();
  format!("| {} |", padded.join(" | "))
}

fn is_fence(line: &str) -> bool {
  let trimmed = line.trim_start();
  trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn is_row(line: &str) -> bool {
  !line.trim().is_empty() && raw_cells(line.trim()).len() > 1
}

fn is_separator(line: &str, columns: usize) -> bool {
  if !is_row(line) {
    return false;
  }
  let cells = split_row(line);
  cells.len() == columns
    && cells.iter().all(|cell| {
      let dashes = cell.trim_start_matches(':').trim_end_matches(':');
      !dashes.is_empty() && dashes.chars().all(|c| c == '-')
    })
}

/// Split on pipes that are not backslash-escaped. Escapes stay in place.
fn raw_cells(text: &str) -> Vec<&str> {
  let mut cells = Vec::new();
  let mut start = 0;
  let mut escaped = false;
  for (i, c) in text.char_indices() {
    match c {
      _ if escaped => escaped = false,
      '\\' => escaped = true,
      '|' => {
        cells.push(&text[start..i]);
        start = i + 1;
      }
      _ => {}
    }
  }
  cells.push(&text[start..]);
  cells
}

/// Split a row into unescaped, trimmed cells.
fn split_row(line: &str) -> Vec<String> {
  let mut cells = raw_cells(line.trim());
  // Outer pipes leave an empty piece at either end
  if cells.len() > 1 && cells[0].trim().is_empty() {
    cells.remove(0);
  }
  if cells.len() > 1 && cells.last().is_some_and(|c| c.trim().is_empty()) {
    cells.pop();
  }
  cells.into_iter().map(|c| unescape(c.trim())).collect()
}

const LINE_BREAK: &str = "<br>";

/// Escape cell text for a single table line.
///
/// `\`, `|` and a literal `<br>` are backslash-escaped; newlines become
/// `<br>`.
fn escape(content: &str) -> String {
  let mut out = String::with_capacity(content.len());
  let mut rest = content;
  while let Some(c) = rest.chars().next() {
    if rest.starts_with(LINE_BREAK) {
      out.push('\\');
      out.push_str(LINE_BREAK);
      rest = &rest[LINE_BREAK.len()..];
      continue;
    }
    match c {
      '\\' => out.push_str("\\\\"),
      '|' => out.push_str("\\|"),
      '\n' => out.push_str(LINE_BREAK),
      _ => out.push(c),
    }
    rest = &rest[c.len_utf8()..];
  }
  out
}

/// Reverse of `escape`. A backslash before anything other than `\`, `|` or
/// `<` is kept as written.
fn unescape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(c) = rest.chars().next() {
    if c == '\\' {
      match rest[1..].chars().next() {
        Some(next @ ('\\' | '|' | '<')) => {
          out.push(next);
          rest = &rest[1 + next.len_utf8()..];
        }
        _ => {
          out.push('\\');
          rest = &rest[1..];
        }
      }
    } else if let Some(after) = rest.strip_prefix(LINE_BREAK) {
      out.push('\n');
      rest = after;
    } else {
      out.push(c);
      rest = &rest[c.len_utf8()..];
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn strings(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows
      .iter()
      .map(|row| row.iter().map(|c| c.to_string()).collect())
      .collect()
  }

  #[test]
  fn test_parse_basic_table() {
    let table = parse("| Shot | Artist |\n| --- | --- |\n| SH010 | Mara |\n| SH020 | Ilya |").unwrap();
    assert_eq!(
      table.contents(),
      strings(&[&["Shot", "Artist"], &["SH010", "Mara"], &["SH020", "Ilya"]])
    );
  }

  #[test]
  fn test_parse_plain_text_is_none() {
    assert!(parse("just some text").is_none());
    assert!(parse("| lonely | row |").is_none());
    assert!(parse("").is_none());
  }

  #[test]
  fn test_parse_drops_alignment_markers() {
    let table = parse("| Left | Center | Right |\n|:---|:---:|---:|\n| a | b | c |").unwrap();
    assert_eq!(table.shape(), (2, 3));
    let rendered = serialize(&table);
    assert!(!rendered.contains(':'));
  }

  #[test]
  fn test_parse_without_outer_pipes() {
    let table = parse("a | b\n--|--\n1 | 2").unwrap();
    assert_eq!(table.contents(), strings(&[&["a", "b"], &["1", "2"]]));
  }

  #[test]
  fn test_ragged_rows_are_normalized() {
    let table = parse("| a | b | c |\n|---|---|---|\n| 1 |\n| 1 | 2 | 3 | 4 |").unwrap();
    assert_eq!(
      table.contents(),
      strings(&[&["a", "b", "c"], &["1", "", ""], &["1", "2", "3"]])
    );
  }

  #[test]
  fn test_separator_must_match_header_width() {
    assert!(parse("| a | b |\n| --- |\n| 1 | 2 |").is_none());
  }

  #[test]
  fn test_serialize_pads_columns() {
    let table = TableModel::empty(2, 2)
      .unwrap()
      .update_cell(1, 0, "SH010_comp")
      .unwrap();
    let expected = "\
| Header 1   | Header 2 |
| ---------- | -------- |
| SH010_comp |          |";
    assert_eq!(serialize(&table), expected);
  }

  #[test]
  fn test_serialize_short_cells_get_three_dashes() {
    let table = parse("|a|b|\n|-|-|\n|1|2|").unwrap();
    assert_eq!(serialize(&table), "| a   | b   |\n| --- | --- |\n| 1   | 2   |");
  }

  #[test]
  fn test_round_trip_preserves_contents() {
    let source = "| Shot | Notes |\n| --- | --- |\n| SH010 | fix edge |\n| SH020 |  |";
    let first = parse(source).unwrap();
    let second = parse(&serialize(&first)).unwrap();
    assert_eq!(first.contents(), second.contents());
    assert_eq!(serialize(&first), serialize(&second));
  }

  #[test]
  fn test_pipes_and_newlines_survive_round_trip() {
    let table = TableModel::empty(2, 1)
      .unwrap()
      .update_cell(1, 0, "a | b\nnext line")
      .unwrap();
    let rendered = serialize(&table);
    assert!(rendered.contains("a \\| b<br>next line"));
    let reparsed = parse(&rendered).unwrap();
    assert_eq!(reparsed.cell(1, 0), Some("a | b\nnext line"));
  }

  #[test]
  fn test_any_cell_text_survives_round_trip() {
    let samples = [
      "a | b",
      "line<br>break",
      "back\\slash",
      "ends with \\",
      "\\|",
      "\\<br>",
      "\\\\",
      "<BR> stays",
      "C:\\path\\to",
      "multi\nline<br>mixed",
      "  padded  ",
      " | ",
      "---",
      "",
      "done ✓ | 100%",
    ];
    for sample in samples {
      let table = TableModel::empty(2, 2)
        .unwrap()
        .update_cell(0, 1, sample)
        .unwrap()
        .update_cell(1, 0, sample)
        .unwrap();
      let rendered = serialize(&table);
      let reparsed = parse(&rendered).unwrap();
      assert_eq!(reparsed.contents(), table.contents(), "cell {:?}", sample);
      assert_eq!(reparsed.cell(1, 0), Some(sample.trim()), "cell {:?}", sample);
      assert_eq!(serialize(&reparsed), rendered);
    }
  }

  #[test]
  fn test_unknown_escapes_are_kept_literally() {
    let table = parse("| path |\n| --- |\n| C:\\temp\\new |").unwrap();
    assert_eq!(table.cell(1, 0), Some("C:\\temp\\new"));
  }

  #[test]
  fn test_find_tables_in_document() {
    let doc = "# Notes\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\ntext\n\nx | y\n--|--\n";
    let spans = find_tables(doc);
    assert_eq!(spans.len(), 2);
    assert_eq!((spans[0].start_line, spans[0].end_line), (2, 5));
    assert_eq!((spans[1].start_line, spans[1].end_line), (8, 10));
    assert_eq!(spans[1].table.shape(), (1, 2));
  }

  #[test]
  fn test_tables_in_code_fences_are_ignored() {
    let doc = "```\n| a | b |\n|---|---|\n```\n";
    assert!(find_tables(doc).is_empty());
  }

  #[test]
  fn test_format_document_keeps_prose() {
    let doc = "Intro\n|a|b|\n|-|-|\n|1|2|\nOutro\n";
    let formatted = format_document(doc);
    assert_eq!(
      formatted,
      "Intro\n| a   | b   |\n| --- | --- |\n| 1   | 2   |\nOutro\n"
    );
  }

  #[test]
  fn test_replace_table_by_index() {
    let doc = "|a|\n|-|\n\n|b|\n|-|";
    let replacement = TableModel::empty(1, 1).unwrap();
    let updated = replace_table(doc, 1, &replacement).unwrap();
    assert_eq!(updated, "|a|\n|-|\n\n| Header 1 |\n| -------- |");
    assert!(replace_table(doc, 2, &replacement).is_none());
  }
}
