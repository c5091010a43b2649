use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Shown in place of a value that is undefined (e.g. 0/0 contribution)
pub const PLACEHOLDER: &str = "n/a";

/// A single read-only table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Integer(u64),
    Real(f64),
    /// Value exists conceptually but cannot be computed
    Undefined,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Non-finite reals become [`Cell::Undefined`].
    pub fn real(value: f64) -> Self {
        if value.is_finite() { Cell::Real(value) } else { Cell::Undefined }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Cell::Undefined)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Real(v) => Some(*v),
            Cell::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Cell::Integer(_) | Cell::Real(_) => 0,
            Cell::Text(_) => 1,
            Cell::Undefined => 2,
        }
    }

    /// Total order used for sorting: numbers, then text, then undefined.
    pub fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Integer(v) => write!(f, "{}", v),
            Cell::Real(v) => write!(f, "{}", format_real(*v)),
            Cell::Undefined => write!(f, "{}", PLACEHOLDER),
        }
    }
}

/// Compact numeric rendering: plain for moderate magnitudes, scientific otherwise.
pub fn format_real(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if (1e-3..1e6).contains(&value.abs()) {
        let s = format!("{:.6}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        format!("{:.4e}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Row-oriented table produced by a navigation action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTable {
    title: String,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    #[serde(skip)]
    sort: Option<(usize, SortOrder)>,
}

impl DataTable {
    pub fn new(title: impl Into<String>, columns: Vec<impl Into<String>>) -> Self {
        Self {
            title: title.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            sort: None,
        }
    }

    /// Appends a row; it is padded or truncated to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Undefined);
        self.rows.push(row);
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// All cells of a column, in current row order
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn sort_state(&self) -> Option<(usize, SortOrder)> {
        self.sort
    }

    /// Stable sort of rows by one column; out-of-range columns are ignored.
    pub fn sort_by(&mut self, column: usize, order: SortOrder) {
        if column >= self.columns.len() {
            return;
        }
        self.rows.sort_by(|a, b| {
            let ordering = a[column].compare(&b[column]);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        self.sort = Some((column, order));
    }

    /// Advances the sort: next column ascending, then descending, then the following column.
    pub fn cycle_sort(&mut self) {
        let (column, order) = match self.sort {
            None => (0, SortOrder::Ascending),
            Some((c, SortOrder::Ascending)) => (c, SortOrder::Descending),
            Some((c, SortOrder::Descending)) => ((c + 1) % self.columns.len().max(1), SortOrder::Ascending),
        };
        self.sort_by(column, order);
    }

    /// Widest rendered width per column, headers included
    pub fn column_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .map(|row| row[i].to_string().chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataTable {
        let mut table = DataTable::new("Sample", vec!["Id", "Value"]);
        table.push_row(vec![Cell::text("b"), Cell::real(0.2)]);
        table.push_row(vec![Cell::text("a"), Cell::Undefined]);
        table.push_row(vec![Cell::text("c"), Cell::real(0.1)]);
        table
    }

    #[test]
    fn test_non_finite_reals_are_undefined() {
        assert!(Cell::real(f64::NAN).is_undefined());
        assert!(Cell::real(f64::INFINITY).is_undefined());
        assert_eq!(Cell::Undefined.to_string(), PLACEHOLDER);
    }

    #[test]
    fn test_sort_puts_undefined_last() {
        let mut table = sample();
        table.sort_by(1, SortOrder::Ascending);
        let ids: Vec<String> = table.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_cycle_sort_walks_columns() {
        let mut table = sample();
        table.cycle_sort();
        assert_eq!(table.sort_state(), Some((0, SortOrder::Ascending)));
        table.cycle_sort();
        assert_eq!(table.sort_state(), Some((0, SortOrder::Descending)));
        assert_eq!(table.cell(0, 0), Some(&Cell::text("c")));
        table.cycle_sort();
        assert_eq!(table.sort_state(), Some((1, SortOrder::Ascending)));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = DataTable::new("t", vec!["a", "b", "c"]);
        table.push_row(vec![Cell::Integer(1)]);
        assert_eq!(table.rows()[0].len(), 3);
        assert!(table.rows()[0][2].is_undefined());
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(0.25), "0.25");
        assert_eq!(format_real(1.0), "1");
        assert_eq!(format_real(1.5e-7), "1.5000e-7");
    }
}
