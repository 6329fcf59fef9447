//! The shared reference parser: A1-style cells and ranges, bare column
//! letters, bare row numbers, and the Excel-style column-letter bijection.
//!
//! Every handler converts human-readable references through this module so
//! that off-by-one behavior lives in exactly one place. Rows and columns are
//! zero-based everywhere past this boundary.

use serde::{Deserialize, Serialize};

/// A single zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

/// A zero-based rectangular range: origin plus extent.
///
/// A single cell is a degenerate range with `num_rows == num_cols == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeRef {
    pub start_row: usize,
    pub start_col: usize,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl RangeRef {
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            start_row: row,
            start_col: col,
            num_rows: 1,
            num_cols: 1,
        }
    }

    pub fn end_row(&self) -> usize {
        self.start_row + self.num_rows.saturating_sub(1)
    }

    pub fn end_col(&self) -> usize {
        self.start_col + self.num_cols.saturating_sub(1)
    }

    /// Render back to A1 notation ("A1" for single cells, "A1:C3" otherwise).
    pub fn a1(&self) -> String {
        let start = format!("{}{}", column_letters(self.start_col), self.start_row + 1);
        if self.num_rows == 1 && self.num_cols == 1 {
            start
        } else {
            format!(
                "{}:{}{}",
                start,
                column_letters(self.end_col()),
                self.end_row() + 1
            )
        }
    }
}

/// Encode a zero-based column index as letters: 0 -> "A", 25 -> "Z", 26 -> "AA".
///
/// Base-26 with no digit for zero, so the usual positional arithmetic is
/// shifted by one at every step.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = String::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.insert(0, (b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters
}

/// Decode column letters back to a zero-based index. Exact inverse of
/// [`column_letters`] for all non-negative indices.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut acc: usize = 0;
    for ch in letters.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        acc = acc * 26 + (ch as usize - 'A' as usize + 1);
    }
    Some(acc - 1)
}

/// Parse an A1 cell reference like "B7" into zero-based coordinates.
pub fn parse_cell(text: &str) -> Option<CellRef> {
    let text = text.trim();
    let split = text.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = text.split_at(split);
    let col = column_index(letters)?;
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some(CellRef { row: row - 1, col })
}

/// Parse "A1:C3" or a single cell "A1" into a [`RangeRef`].
///
/// Corners may be given in any order; the result is normalized so the
/// origin is the top-left cell.
pub fn parse_range(text: &str) -> Option<RangeRef> {
    let text = text.trim();
    match text.split_once(':') {
        None => {
            let cell = parse_cell(text)?;
            Some(RangeRef::cell(cell.row, cell.col))
        }
        Some((a, b)) => {
            let first = parse_cell(a)?;
            let second = parse_cell(b)?;
            let start_row = first.row.min(second.row);
            let start_col = first.col.min(second.col);
            let end_row = first.row.max(second.row);
            let end_col = first.col.max(second.col);
            Some(RangeRef {
                start_row,
                start_col,
                num_rows: end_row - start_row + 1,
                num_cols: end_col - start_col + 1,
            })
        }
    }
}

/// Parse a bare column reference: letters ("D") or a 1-based number ("4").
pub fn parse_column(text: &str) -> Option<usize> {
    let text = text.trim();
    if text.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = text.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some(n - 1);
    }
    if text.chars().all(|c| c.is_ascii_alphabetic()) {
        return column_index(text);
    }
    None
}

/// Parse a bare 1-based row reference ("3") to a zero-based index.
pub fn parse_row(text: &str) -> Option<usize> {
    let n: usize = text.trim().parse().ok()?;
    if n == 0 {
        return None;
    }
    Some(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_letters_fixed_points() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(51), "AZ");
        assert_eq!(column_letters(52), "BA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_column_index_fixed_points() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1"), Some(CellRef { row: 0, col: 0 }));
        assert_eq!(parse_cell("D3"), Some(CellRef { row: 2, col: 3 }));
        assert_eq!(parse_cell("AA10"), Some(CellRef { row: 9, col: 26 }));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("7"), None);
        assert_eq!(parse_cell("bold"), None);
    }

    #[test]
    fn test_parse_range_normalizes_corners() {
        let range = parse_range("C3:A1").unwrap();
        assert_eq!(
            range,
            RangeRef {
                start_row: 0,
                start_col: 0,
                num_rows: 3,
                num_cols: 3
            }
        );
    }

    #[test]
    fn test_parse_range_single_cell() {
        assert_eq!(parse_range("B2"), Some(RangeRef::cell(1, 1)));
    }

    #[test]
    fn test_range_a1_round_trip() {
        for text in ["A1", "A1:B2", "C3:D9", "AA10:AB12"] {
            assert_eq!(parse_range(text).unwrap().a1(), text);
        }
    }

    #[test]
    fn test_parse_column_letters_and_numbers() {
        assert_eq!(parse_column("D"), Some(3));
        assert_eq!(parse_column("4"), Some(3));
        assert_eq!(parse_column("0"), None);
        assert_eq!(parse_column("D4"), None);
    }

    #[test]
    fn test_parse_row() {
        assert_eq!(parse_row("3"), Some(2));
        assert_eq!(parse_row("0"), None);
        assert_eq!(parse_row("x"), None);
    }

    proptest! {
        #[test]
        fn column_round_trip(n in 0usize..10_000) {
            prop_assert_eq!(column_index(&column_letters(n)), Some(n));
        }

        #[test]
        fn column_letters_are_uppercase_ascii(n in 0usize..100_000) {
            let letters = column_letters(n);
            prop_assert!(!letters.is_empty());
            prop_assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
        }
    }
}
