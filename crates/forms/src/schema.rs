//! Term registry JSON schema types

use crate::fees::FeeTable;
use serde::{Deserialize, Serialize};

/// Default output filename pattern
pub const DEFAULT_FILENAME: &str = "{code}_{studentNumber}_{studentName}.pdf";

/// Default date format for stamped dates
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

/// One academic term: fees, font and the documents to produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TermConfig {
    /// Term identifier (e.g. "intersession")
    pub term: String,

    /// Human-readable label, usable as static text
    #[serde(default)]
    pub label: String,

    /// strftime pattern for stamped dates
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Font used for every text placement
    #[serde(default)]
    pub font: FontDef,

    /// Appliance fees
    #[serde(default)]
    pub fees: FeeTable,

    /// Documents in output order
    pub documents: Vec<DocumentDescriptor>,
}

impl TermConfig {
    /// Descriptor for a document code
    pub fn document(&self, code: &str) -> Option<&DocumentDescriptor> {
        self.documents.iter().find(|d| d.code == code)
    }

    /// Placements of a document (empty for unknown codes)
    pub fn placements_for(&self, code: &str) -> &[Placement] {
        self.document(code)
            .map(|d| d.placements.as_slice())
            .unwrap_or(&[])
    }
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

/// Font definition
///
/// Without a `source`, `family` names a standard font ("Helvetica",
/// "Courier"). With one, the TrueType file is loaded through the template
/// source and registered under `family`. `color` is the 0-255 RGB fill of
/// every stamped text run and mark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FontDef {
    #[serde(default = "default_font_family")]
    pub family: String,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub color: [u8; 3],
}

impl Default for FontDef {
    fn default() -> Self {
        Self {
            family: default_font_family(),
            source: None,
            color: [0, 0, 0],
        }
    }
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

/// One output document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentDescriptor {
    /// Short code used in filenames (e.g. "ADF")
    pub code: String,

    #[serde(default)]
    pub title: String,

    /// Template reference resolved by the template source
    pub template: String,

    /// Output filename pattern
    #[serde(default = "default_filename")]
    pub filename: String,

    #[serde(default)]
    pub placements: Vec<Placement>,
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

/// Where something is drawn on a document (tagged union)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Placement {
    /// A record value
    Text(TextPlacement),

    /// A glyph drawn when a key is selected
    Mark(MarkPlacement),

    /// The captured signature
    Signature(SignaturePlacement),
}

impl Placement {
    /// Page index (0-based)
    pub fn page(&self) -> usize {
        match self {
            Placement::Text(p) => p.page,
            Placement::Mark(p) => p.page,
            Placement::Signature(p) => p.page,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Placement::Text(p) => p.position,
            Placement::Mark(p) => p.position,
            Placement::Signature(p) => p.position,
        }
    }

    /// Short description for logs and error messages
    pub fn describe(&self) -> String {
        match self {
            Placement::Text(p) => format!("text {:?}", p.field),
            Placement::Mark(p) => format!("mark {}", p.key),
            Placement::Signature(_) => "signature".to_string(),
        }
    }
}

/// Anchor point in PDF points
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,

    pub y: f64,

    /// Which page edge `y` is measured from
    #[serde(default)]
    pub origin: Origin,
}

impl Position {
    /// Y in PDF coordinates, given the top edge of the page's MediaBox
    pub fn pdf_y(&self, page_top: f64) -> f64 {
        match self.origin {
            Origin::Bottom => self.y,
            Origin::Top => page_top - self.y,
        }
    }
}

/// Vertical origin of a position
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// PDF convention, y grows upward
    #[default]
    Bottom,
    /// Screen convention, y grows downward
    Top,
}

/// How text is placed relative to the anchor X
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Left,
    Center,
    Right,
}

impl From<Anchor> for pdf_core::Align {
    fn from(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Left => pdf_core::Align::Left,
            Anchor::Center => pdf_core::Align::Center,
            Anchor::Right => pdf_core::Align::Right,
        }
    }
}

/// Record values a text placement can show
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    StudentName,
    StudentFirstName,
    StudentLastName,
    StudentNumber,
    StudentDob,
    Building,
    Room,
    BuildingRoom,
    StudentEmail,
    ParentName,
    ParentContact,
    ParentAltContact,
    ParentAddress,
    ParentRelation,
    ParentEmail,
    AltEmergencyName,
    AltEmergencyContact,
    OtherAppliances,
    OtherAppliancesCost,
    FeeTotal,
    SubmissionDate,
    /// Fixed text from the placement
    Static,
}

/// Text placement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPlacement {
    pub field: Field,

    /// Text for `static` fields
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub page: usize,

    pub position: Position,

    #[serde(default)]
    pub anchor: Anchor,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub size: f32,
}

/// Checkbox-style mark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkPlacement {
    /// Appliance or consent key
    pub key: String,

    #[serde(default)]
    pub group: MarkGroup,

    #[serde(default = "default_mark_glyph")]
    pub glyph: String,

    #[serde(default)]
    pub page: usize,

    pub position: Position,

    #[serde(default)]
    pub anchor: Anchor,

    #[serde(default = "default_font_size")]
    pub size: f32,
}

/// Which selection a mark key belongs to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkGroup {
    #[default]
    Appliance,
    Consent,
}

/// Signature image box; `position` is its lower-left corner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignaturePlacement {
    #[serde(default)]
    pub page: usize,

    pub position: Position,

    #[serde(default = "default_signature_width")]
    pub width: f64,

    #[serde(default = "default_signature_height")]
    pub height: f64,

    #[serde(default)]
    pub fit: SignatureFit,
}

/// How the signature fills its box
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignatureFit {
    /// Keep the aspect ratio inside the box
    #[default]
    Contain,
    /// Fill the box exactly
    Stretch,
}

impl From<SignatureFit> for pdf_core::ImageScaleMode {
    fn from(fit: SignatureFit) -> Self {
        match fit {
            SignatureFit::Contain => pdf_core::ImageScaleMode::Contain,
            SignatureFit::Stretch => pdf_core::ImageScaleMode::Stretch,
        }
    }
}

fn default_font_size() -> f32 {
    10.0
}

fn default_mark_glyph() -> String {
    "/".to_string()
}

fn default_signature_width() -> f64 {
    120.0
}

fn default_signature_height() -> f64 {
    40.0
}
