//! The comparable-application engine.
//!
//! Record `i` of the payload targets sheet `Comparable_{i+1}`; the mapping
//! is purely positional and nothing in the record can redirect it. Records
//! whose sheet is absent are skipped whole. Every targeted sheet gets
//! `C1 = "Oui"` stamped first, even when the record carries zero non-null
//! fields; then its fields are applied in payload order, duplicates
//! resolving last-write-wins.

use crate::cell_ref::CellAddress;
use crate::error::Result;
use crate::records::{parse_records, ComparableRecord, Scalar};
use crate::workbook::{EditPlan, Workbook};

/// Cell stamped on every targeted sheet.
pub const POPULATED_FLAG_CELL: CellAddress = CellAddress::new(0, 2); // C1
/// The value stamped into [`POPULATED_FLAG_CELL`].
pub const POPULATED_FLAG_VALUE: &str = "Oui";

/// Sheet name targeted by the record at `index` (0-based).
#[must_use]
pub fn comparable_sheet_name(index: usize) -> String {
    format!("Comparable_{}", index + 1)
}

/// Apply a comparables payload to a workbook and return the new container.
///
/// This is the whole engine: one deterministic pass, no state outside the
/// call. See the crate docs for the payload shape.
pub fn apply_comparables(workbook: &[u8], records_json: &str) -> Result<Vec<u8>> {
    let records = parse_records(records_json)?;
    let workbook = Workbook::load(workbook)?;
    apply_records(&workbook, &records)
}

/// [`apply_comparables`], accepting the payload as raw bytes.
///
/// Upstream hands the form part over undecoded; non-UTF-8 bytes are the
/// invalid-input fault.
pub fn apply_comparables_bytes(workbook: &[u8], records_json: &[u8]) -> Result<Vec<u8>> {
    let text = std::str::from_utf8(records_json)?;
    apply_comparables(workbook, text)
}

fn apply_records(workbook: &Workbook, records: &[ComparableRecord]) -> Result<Vec<u8>> {
    let mut patches = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let sheet = comparable_sheet_name(index);
        let Some(path) = workbook.sheet_path(&sheet) else {
            log::debug!("sheet {sheet} not in workbook, skipping record {index}");
            continue;
        };

        let mut plan = EditPlan::new();
        plan.set(
            POPULATED_FLAG_CELL,
            Scalar::Text(POPULATED_FLAG_VALUE.to_string()),
        );
        for field in record {
            if let Some(value) = &field.value {
                plan.set(field.cell, value.clone());
            }
        }

        log::debug!("sheet {sheet}: {} cell write(s) planned", plan.len());
        patches.push((path.to_string(), plan));
    }

    workbook.save_with(&patches)
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
    fn sheet_names_are_one_based() {
        assert_eq!(comparable_sheet_name(0), "Comparable_1");
        assert_eq!(comparable_sheet_name(2), "Comparable_3");
    }

    #[test]
    fn flag_cell_is_c1() {
        assert_eq!(POPULATED_FLAG_CELL.to_string(), "C1");
    }
}
