//! Minimal labelled table: ordered column names plus rows of typed cells.

use std::fmt;

use serde::Serialize;

use crate::types::Count;

/// Label used in the synthetic total row.
pub const TOTAL_LABEL: &str = "Total";

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One table cell: an exact count or a text label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Count(Count),
    Text(String),
}

impl Cell {
    pub fn as_count(&self) -> Option<Count> {
        match self {
            Self::Count(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Count(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<Count> for Cell {
    fn from(n: Count) -> Self {
        Self::Count(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Rows of cells under named columns. Every row has one cell per column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Index of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row`, column `name`.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// First row whose cell in `column` is the text `label`.
    pub fn find_row(&self, column: &str, label: &str) -> Option<usize> {
        let col = self.column_index(column)?;
        self.rows
            .iter()
            .position(|row| row.get(col).and_then(Cell::as_text) == Some(label))
    }

    /// Count in `column` of the row labelled `label` in the label column.
    pub fn count(&self, label_column: &str, label: &str, column: &str) -> Option<Count> {
        let row = self.find_row(label_column, label)?;
        self.cell(row, column)?.as_count()
    }

    /// Render as a GitHub-flavored markdown table.
    ///
    /// Pipes and backslashes in headers and cells are escaped and line
    /// breaks become `<br>`, so every row keeps one cell per column.
    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let mut md = String::new();

        md.push('|');
        for column in &self.columns {
            md.push_str(&format!(" {} |", escape_markdown(column)));
        }
        md.push('\n');

        md.push('|');
        for _ in &self.columns {
            md.push_str(" --- |");
        }
        md.push('\n');

        for row in &self.rows {
            md.push('|');
            for col in 0..self.columns.len() {
                match row.get(col) {
                    Some(cell) => {
                        md.push_str(&format!(" {} |", escape_markdown(&cell.to_string())))
                    }
                    None => md.push_str("  |"),
                }
            }
            md.push('\n');
        }

        md
    }
}

fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '|' => out.push_str("\\|"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br>");
            }
            '\n' => out.push_str("<br>"),
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
