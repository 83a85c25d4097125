//! Residency Forms - coordinate-based stamping of residency PDF templates
//!
//! This crate provides:
//! - The applicant form (mutable draft) and the finalized applicant record
//! - Per-term fee schedules and the fee total
//! - Per-term field placement registries (JSON, two bundled)
//! - The stamping engine drawing text, marks and the signature on a template
//! - The document set orchestrator producing one named PDF per document
//!
//! # Example
//!
//! ```ignore
//! use forms::{ApplicantForm, DirectorySource, Orchestrator, Registry};
//!
//! let registry = Registry::bundled()?;
//! let term = registry.term("intersession")?;
//! let record = form.submit()?;
//!
//! let source = DirectorySource::new("public");
//! for doc in Orchestrator::new(term, &source).generate_all(&record) {
//!     match doc.result {
//!         Ok(bytes) => std::fs::write(&doc.filename, bytes)?,
//!         Err(e) => eprintln!("{}: {e}", doc.code),
//!     }
//! }
//! ```

pub mod fees;
pub mod format;
mod orchestrator;
mod record;
mod registry;
mod schema;
mod stamper;

pub use fees::FeeTable;
pub use orchestrator::{
    DirectorySource, GeneratedDocument, MemorySource, Orchestrator, TemplateSource,
};
pub use record::{
    ApplicantForm, ApplicantRecord, Building, Signature, SignatureCapture, PLACEHOLDER_NAME,
    PLACEHOLDER_NUMBER, REQUIRED_FIELDS,
};
pub use registry::Registry;
pub use schema::*;
pub use stamper::{DrawContent, DrawOp, Stamper};

use thiserror::Error;

/// Errors that can occur while preparing or stamping forms
#[derive(Debug, Error)]
pub enum FormsError {
    #[error("Template unavailable: {reference}: {reason}")]
    TemplateUnavailable { reference: String, reason: String },

    #[error("{document}: page index {page} out of range (template has {page_count} pages)")]
    PageOutOfRange {
        document: String,
        page: usize,
        page_count: usize,
    },

    #[error("{document}: anchor ({x}, {y}) lies outside page {page}")]
    OutOfBounds {
        document: String,
        page: usize,
        x: f64,
        y: f64,
    },

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Unknown term: {0}")]
    UnknownTerm(String),

    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    #[error("Missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] pdf_core::PdfError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for form operations
pub type Result<T> = std::result::Result<T, FormsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = FormsError::Validation(vec!["studentNumber".into(), "room".into()]);
        assert_eq!(err.to_string(), "Missing required fields: studentNumber, room");
    }

    #[test]
    fn test_page_out_of_range_message() {
        let err = FormsError::PageOutOfRange {
            document: "RA".into(),
            page: 1,
            page_count: 1,
        };
        assert_eq!(
            err.to_string(),
            "RA: page index 1 out of range (template has 1 pages)"
        );
    }
}
