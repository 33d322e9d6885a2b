//! Excel-style cell references.
//!
//! A [`CellAddress`] is the validated form of an `"A1"`-style reference.
//! Payload deserialization goes through [`TryFrom<String>`], so a malformed
//! reference is rejected while the JSON is being parsed, not when the write
//! is applied.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{CompfillError, Result};

/// Largest 1-based column Excel accepts ("XFD").
const MAX_COL: u32 = 16_384;
/// Largest 1-based row Excel accepts.
const MAX_ROW: u32 = 1_048_576;

/// A single-cell reference, stored 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct CellAddress {
    row: u32,
    col: u32,
}

impl CellAddress {
    /// Build an address from 0-based row/column indices.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference like `"C4"` (also accepts `"$C$4"` and lowercase).
    ///
    /// Unlike a lenient scanner this rejects anything that is not exactly
    /// column letters followed by a row number: the input comes from the
    /// caller's payload, not from workbook XML we already trust.
    pub fn parse(reference: &str) -> Result<Self> {
        let bad = || CompfillError::CellRef(reference.to_string());

        let mut col: u32 = 0;
        let mut row: u32 = 0;
        let mut letters = 0usize;
        let mut digits = 0usize;

        for ch in reference.trim().chars() {
            if ch == '$' {
                // Absolute markers are allowed before either component.
                if digits > 0 {
                    return Err(bad());
                }
                continue;
            }
            if ch.is_ascii_alphabetic() {
                if digits > 0 {
                    return Err(bad());
                }
                let upper = ch.to_ascii_uppercase();
                col = col
                    .checked_mul(26)
                    .and_then(|c| c.checked_add(u32::from(upper) - u32::from('A') + 1))
                    .ok_or_else(bad)?;
                letters += 1;
            } else if ch.is_ascii_digit() {
                row = row
                    .checked_mul(10)
                    .and_then(|r| r.checked_add(u32::from(ch) - u32::from('0')))
                    .ok_or_else(bad)?;
                digits += 1;
            } else {
                return Err(bad());
            }
        }

        if letters == 0 || digits == 0 || row == 0 || col > MAX_COL || row > MAX_ROW {
            return Err(bad());
        }

        Ok(Self {
            row: row - 1,
            col: col - 1,
        })
    }

    /// 0-based row index.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.row
    }

    /// 0-based column index.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = CompfillError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellAddress {
    type Error = CompfillError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

/// Convert a 0-based column index to Excel column letters (A, B, ..., Z, AA, AB, ...)
#[must_use]
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col + 1; // Convert to 1-based
    while n > 0 {
        n -= 1;
        #[allow(clippy::cast_possible_truncation)]
        let c = char::from(b'A' + (n % 26) as u8);
        result.insert(0, c);
        n /= 26;
    }
    result
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("A1", 0, 0)]
    #[test_case("C4", 3, 2)]
    #[test_case("c4", 3, 2; "lowercase")]
    #[test_case("$C$4", 3, 2; "absolute")]
    #[test_case("Z10", 9, 25)]
    #[test_case("AA1", 0, 26)]
    #[test_case("XFD1048576", 1_048_575, 16_383; "grid corner")]
    fn parses(reference: &str, row: u32, col: u32) {
        let addr = CellAddress::parse(reference).unwrap();
        assert_eq!((addr.row(), addr.col()), (row, col));
    }

    #[test_case(""; "empty")]
    #[test_case("C"; "no row")]
    #[test_case("4"; "no column")]
    #[test_case("C0"; "row zero")]
    #[test_case("4C"; "digits first")]
    #[test_case("C 4"; "inner space")]
    #[test_case("C4:D5"; "range")]
    #[test_case("XFE1"; "past last column")]
    #[test_case("A1048577"; "past last row")]
    fn rejects(reference: &str) {
        assert!(CellAddress::parse(reference).is_err());
    }

    #[test]
    fn round_trips_through_display() {
        for reference in ["A1", "C4", "AA12", "XFD1048576"] {
            let addr = CellAddress::parse(reference).unwrap();
            assert_eq!(addr.to_string(), reference);
        }
    }

    #[test]
    fn column_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(27), "AB");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
    }
}
