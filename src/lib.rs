//! compfill - fills the `Comparable_<N>` sheets of an appraisal workbook.
//!
//! One call in, one workbook out: the engine takes XLSX bytes and a JSON
//! array of per-sheet field lists, writes each field's value into its cell,
//! stamps `C1 = "Oui"` on every targeted sheet, and returns the patched
//! container. Sheets the payload does not match are skipped silently;
//! everything the payload does not touch survives byte-identical.
//!
//! # Usage
//!
//! ```no_run
//! let workbook = std::fs::read("Evaluation_Immobiliere.xlsx")?;
//! let payload = r#"[[{"label": "Adresse (rue)", "cell": "C4", "value": "123 Rue Test"}]]"#;
//!
//! let patched = compfill::apply_comparables(&workbook, payload)?;
//! std::fs::write("Evaluation_Immobiliere_out.xlsx", patched)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The library performs no I/O of its own and installs no logger; skip
//! decisions and patch statistics go through the `log` facade.

pub mod apply;
pub mod cell_ref;
pub mod error;
pub mod records;
pub mod transport;
pub mod workbook;

pub use apply::{
    apply_comparables, apply_comparables_bytes, comparable_sheet_name, POPULATED_FLAG_CELL,
    POPULATED_FLAG_VALUE,
};
pub use cell_ref::CellAddress;
pub use error::{CompfillError, Fault, Result};
pub use records::{parse_records, ComparableRecord, FieldWrite, Scalar};
pub use workbook::Workbook;
