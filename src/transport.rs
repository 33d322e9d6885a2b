//! The contract between this crate and the request layer that embeds it.
//!
//! The HTTP transport itself (multipart decoding, routing, response
//! assembly) lives outside this crate; these constants and helpers are the
//! single source of truth it builds on, so field names and status mapping
//! cannot drift between deployments.

use crate::error::{CompfillError, Fault};

/// Multipart field carrying the uploaded workbook (binary part).
pub const WORKBOOK_FIELD: &str = "workbook";

/// Multipart field carrying the comparables JSON (text part).
pub const PAYLOAD_FIELD: &str = "data";

/// Accepted alias for [`PAYLOAD_FIELD`]. Existing callers use both names;
/// neither is canonical.
pub const PAYLOAD_FIELD_ALIAS: &str = "comparables_array";

/// Content type of the response body.
pub const RESPONSE_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Default download filename proposed to the client.
pub const RESPONSE_FILENAME: &str = "Evaluation_Immobiliere.xlsx";

/// Whether a multipart field name carries the comparables JSON.
#[must_use]
pub fn is_payload_field(name: &str) -> bool {
    name == PAYLOAD_FIELD || name == PAYLOAD_FIELD_ALIAS
}

/// `Content-Disposition` value for the response.
#[must_use]
pub fn content_disposition() -> String {
    format!("attachment; filename=\"{RESPONSE_FILENAME}\"")
}

/// Default HTTP status for an engine error.
///
/// Invalid payloads are the caller's fault; everything else is reported as
/// a server-side failure. An embedder that can attribute an unreadable
/// workbook to a bad upload may map [`Fault::InvalidDocument`] to a 4xx
/// instead.
#[must_use]
pub fn response_status(error: &CompfillError) -> u16 {
    match error.fault() {
        Fault::InvalidInput => 400,
        Fault::InvalidDocument | Fault::Internal => 500,
    }
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
    fn both_payload_field_names_are_accepted() {
        assert!(is_payload_field("data"));
        assert!(is_payload_field("comparables_array"));
        assert!(!is_payload_field("workbook"));
        assert!(!is_payload_field("Data"));
    }

    #[test]
    fn content_disposition_proposes_the_fixed_filename() {
        assert_eq!(
            content_disposition(),
            "attachment; filename=\"Evaluation_Immobiliere.xlsx\""
        );
    }

    #[test]
    fn bad_payload_maps_to_400() {
        let err = crate::records::parse_records("{not valid json").unwrap_err();
        assert_eq!(response_status(&err), 400);
    }

    #[test]
    fn unreadable_workbook_maps_to_500() {
        let err = crate::workbook::Workbook::load(b"not a zip").unwrap_err();
        assert_eq!(response_status(&err), 500);
    }
}
