//! Structured error types for compfill.
//!
//! One enum for the whole crate, plus a coarse [`Fault`] classification so
//! the embedding request layer can pick a status code without matching on
//! individual variants.

/// All errors that can occur while applying comparables to a workbook.
#[derive(Debug, thiserror::Error)]
pub enum CompfillError {
    /// The comparables payload is not valid JSON, or not the expected
    /// array-of-arrays shape (this includes malformed cell references,
    /// which are rejected during deserialization).
    #[error("invalid comparables payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The comparables payload bytes are not valid UTF-8.
    #[error("comparables payload is not valid UTF-8: {0}")]
    PayloadEncoding(#[from] std::str::Utf8Error),

    /// Invalid cell reference.
    #[error("invalid cell reference: {0:?}")]
    CellRef(String),

    /// The uploaded bytes could not be opened as an XLSX container.
    #[error("unreadable workbook: {0}")]
    Workbook(String),

    /// ZIP archive error past the load phase (patching, re-serialization).
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error past the load phase.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CompfillError>;

/// Coarse classification of an error for the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The caller sent a bad payload; report as a client error.
    InvalidInput,
    /// The uploaded workbook is not a readable XLSX container.
    InvalidDocument,
    /// Anything else: patching or serialization failed.
    Internal,
}

impl CompfillError {
    /// Build a [`CompfillError::Workbook`] from any loader failure.
    pub(crate) fn workbook(err: impl std::fmt::Display) -> Self {
        Self::Workbook(err.to_string())
    }

    /// Which fault class this error belongs to.
    #[must_use]
    pub fn fault(&self) -> Fault {
        match self {
            Self::Payload(_) | Self::PayloadEncoding(_) | Self::CellRef(_) => Fault::InvalidInput,
            Self::Workbook(_) => Fault::InvalidDocument,
            Self::Zip(_) | Self::Xml(_) | Self::Io(_) => Fault::Internal,
        }
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
    fn payload_errors_are_client_faults() {
        let err = match serde_json::from_str::<serde_json::Value>("{not json") {
            Err(e) => CompfillError::from(e),
            Ok(_) => return,
        };
        assert_eq!(err.fault(), Fault::InvalidInput);
    }

    #[test]
    fn workbook_errors_are_document_faults() {
        assert_eq!(
            CompfillError::workbook("not a zip").fault(),
            Fault::InvalidDocument
        );
    }

    #[test]
    fn io_errors_are_internal() {
        let err = CompfillError::from(std::io::Error::other("disk gone"));
        assert_eq!(err.fault(), Fault::Internal);
    }
}
