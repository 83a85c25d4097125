//! PDF Core - page-level stamping on top of lopdf
//!
//! This crate provides functionality for:
//! - Opening PDF templates from bytes or a path
//! - Measuring and drawing text with the standard Type1 fonts or an embedded TrueType font
//! - Drawing images (JPEG, PNG with transparency)
//! - Serializing the result deterministically
//!
//! Pages are addressed by 0-based index and coordinates are PDF points with
//! the origin at the bottom-left corner of the page.
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Align, PdfDocument, StandardFont};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! doc.use_standard_font(StandardFont::Helvetica);
//! doc.set_font("Helvetica", 10.0)?;
//! doc.insert_text("Juan Dela Cruz", 0, 300.0, 640.0, Align::Center)?;
//! let bytes = doc.to_bytes()?;
//! ```

mod document;
mod font;
mod image;
mod metrics;
mod text;

pub use document::{object_to_f64, Color, PageBox, PdfDocument};
pub use font::{Font, StandardFont, TrueTypeFont};
pub use image::{calculate_scaled_dimensions, ImageScaleMode};
pub use text::{format_number, generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Page index {0} out of range (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment relative to the anchor X coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Starting X for a run of `text_width` points anchored at `x`
    pub fn start_x(self, x: f64, text_width: f64) -> f64 {
        match self {
            Align::Left => x,
            Align::Center => x - text_width / 2.0,
            Align::Right => x - text_width,
        }
    }
}
