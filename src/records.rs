//! The comparables payload: a JSON array of per-sheet field lists.
//!
//! Shape accepted from the caller:
//!
//! ```json
//! [
//!   [
//!     {"label": "Adresse (rue)", "cell": "C4", "value": "123 Rue Test"},
//!     {"cell": "C10", "value": null}
//!   ],
//!   []
//! ]
//! ```
//!
//! The outer index is significant: entry `i` targets sheet `Comparable_{i+1}`.
//! `label` and any unknown keys are carried by the caller for its own
//! bookkeeping and are not interpreted here.

use serde::Deserialize;

use crate::cell_ref::CellAddress;
use crate::error::Result;

/// A single value destined for a cell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One field of a comparable: where to write, and (optionally) what.
///
/// A missing or `null` `value` means the target cell keeps whatever the
/// uploaded workbook already had there.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldWrite {
    /// Target cell on the record's sheet, validated during deserialization.
    pub cell: CellAddress,
    /// Value to write, if any.
    #[serde(default)]
    pub value: Option<Scalar>,
    /// Caller-side description of the field; not interpreted.
    #[serde(default)]
    pub label: Option<String>,
}

/// All fields destined for one `Comparable_<N>` sheet.
pub type ComparableRecord = Vec<FieldWrite>;

/// Parse the payload text into records.
///
/// Any failure (malformed JSON, wrong shape, bad cell reference) is the
/// invalid-input fault; nothing is coerced or partially recovered.
pub fn parse_records(json: &str) -> Result<Vec<ComparableRecord>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_documented_shape() {
        let records = parse_records(
            r#"[
                [
                    {"label": "Adresse (rue)", "cell": "C4", "value": "123 Rue Test"},
                    {"cell": "C5", "value": 417000},
                    {"cell": "C6", "value": true},
                    {"cell": "C7", "value": null},
                    {"cell": "C8"}
                ],
                []
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 5);
        assert_eq!(records[1].len(), 0);

        assert_eq!(records[0][0].cell.to_string(), "C4");
        assert_eq!(
            records[0][0].value,
            Some(Scalar::Text("123 Rue Test".to_string()))
        );
        assert_eq!(records[0][0].label.as_deref(), Some("Adresse (rue)"));
        assert_eq!(records[0][1].value, Some(Scalar::Number(417_000.0)));
        assert_eq!(records[0][2].value, Some(Scalar::Bool(true)));
        assert_eq!(records[0][3].value, None);
        assert_eq!(records[0][4].value, None);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let records =
            parse_records(r#"[[{"cell": "A1", "value": "x", "unit": "sqft", "order": 3}]]"#)
                .unwrap();
        assert_eq!(records[0][0].value, Some(Scalar::Text("x".to_string())));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_records("{not valid json").is_err());
    }

    #[test]
    fn rejects_wrong_shape() {
        // An object where the array of records should be.
        assert!(parse_records(r#"{"cell": "A1"}"#).is_err());
        // A flat array of fields (missing the per-sheet nesting).
        assert!(parse_records(r#"[{"cell": "A1", "value": 1}]"#).is_err());
    }

    #[test]
    fn rejects_bad_cell_reference() {
        let err = parse_records(r#"[[{"cell": "1C", "value": "x"}]]"#).unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn number_scalars_cover_ints_and_floats() {
        let records = parse_records(r#"[[{"cell":"A1","value":7},{"cell":"A2","value":7.5}]]"#)
            .unwrap();
        assert_eq!(records[0][0].value, Some(Scalar::Number(7.0)));
        assert_eq!(records[0][1].value, Some(Scalar::Number(7.5)));
    }
}
