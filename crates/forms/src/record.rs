//! Applicant form (editable draft) and applicant record (finalized)

use crate::{FormsError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Filename student number used when none was entered
pub const PLACEHOLDER_NUMBER: &str = "1234";

/// Filename student name used when none was entered
pub const PLACEHOLDER_NAME: &str = "Sample";

/// Fields that must be filled before a form can be submitted
pub const REQUIRED_FIELDS: &[&str] = &[
    "studentFirstName",
    "studentLastName",
    "studentNumber",
    "studentDob",
    "building",
    "room",
    "studentEmail",
    "parentFirstName",
    "parentLastName",
    "parentContact",
    "parentAddress",
    "parentRelation",
    "altEmergencyName",
    "altEmergencyContact",
];

const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";

/// Residence hall
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Building {
    Acacia,
    Ipil,
    Molave,
    Narra,
    Yakal,
}

impl Building {
    pub const ALL: [Building; 5] = [
        Building::Acacia,
        Building::Ipil,
        Building::Molave,
        Building::Narra,
        Building::Yakal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Building::Acacia => "Acacia",
            Building::Ipil => "Ipil",
            Building::Molave => "Molave",
            Building::Narra => "Narra",
            Building::Yakal => "Yakal",
        }
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Building {
    type Err = FormsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Building::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FormsError::InvalidField {
                field: "building".to_string(),
                reason: format!("unknown building {s:?}"),
            })
    }
}

/// A captured signature raster (PNG or JPEG bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Signature {
    /// Wrap raw image bytes, checking they look like PNG or JPEG
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

        if bytes.starts_with(PNG) || bytes.starts_with(JPEG) {
            Ok(Self { bytes })
        } else {
            Err(FormsError::Signature(
                "signature must be a PNG or JPEG image".to_string(),
            ))
        }
    }

    /// Decode a `data:image/png;base64,...` (or `image/jpeg`) URL
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| FormsError::Signature("not a data URL".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| FormsError::Signature("data URL has no payload".to_string()))?;

        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FormsError::Signature("data URL is not base64".to_string()))?;
        if !matches!(media_type, "image/png" | "image/jpeg" | "image/jpg") {
            return Err(FormsError::Signature(format!(
                "unsupported media type {media_type:?}"
            )));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| FormsError::Signature(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Signature capture surface
pub trait SignatureCapture {
    /// Whether nothing has been drawn yet
    fn is_empty(&self) -> bool;

    /// The drawing as a base64 image data URL
    fn to_data_url(&self) -> String;
}

/// A data URL already exported by the capture surface
impl SignatureCapture for str {
    fn is_empty(&self) -> bool {
        self.trim().is_empty()
    }

    fn to_data_url(&self) -> String {
        self.trim().to_string()
    }
}

/// Editable draft of the applicant form
///
/// Values are kept exactly as entered. Dates use `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicantForm {
    pub student_first_name: String,
    pub student_last_name: String,
    pub student_number: String,
    pub student_dob: String,
    pub building: String,
    pub room: String,
    pub student_email: String,
    pub parent_first_name: String,
    pub parent_last_name: String,
    pub parent_contact: String,
    pub parent_alt_contact: String,
    pub parent_address: String,
    pub parent_relation: String,
    pub parent_email: String,
    pub alt_emergency_name: String,
    pub alt_emergency_contact: String,
    pub appliances: BTreeSet<String>,
    pub consents: BTreeSet<String>,
    pub other_appliances: String,
    pub other_appliances_cost: String,
    /// Signature as a data URL
    pub signature: Option<String>,
    pub submission_date: String,
}

impl ApplicantForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text field by its camelCase name
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "studentFirstName" => &self.student_first_name,
            "studentLastName" => &self.student_last_name,
            "studentNumber" => &self.student_number,
            "studentDob" => &self.student_dob,
            "building" => &self.building,
            "room" => &self.room,
            "studentEmail" => &self.student_email,
            "parentFirstName" => &self.parent_first_name,
            "parentLastName" => &self.parent_last_name,
            "parentContact" => &self.parent_contact,
            "parentAltContact" => &self.parent_alt_contact,
            "parentAddress" => &self.parent_address,
            "parentRelation" => &self.parent_relation,
            "parentEmail" => &self.parent_email,
            "altEmergencyName" => &self.alt_emergency_name,
            "altEmergencyContact" => &self.alt_emergency_contact,
            "otherAppliances" => &self.other_appliances,
            "otherAppliancesCost" => &self.other_appliances_cost,
            "submissionDate" => &self.submission_date,
            _ => return None,
        };
        Some(value)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        let value = match name {
            "studentFirstName" => &mut self.student_first_name,
            "studentLastName" => &mut self.student_last_name,
            "studentNumber" => &mut self.student_number,
            "studentDob" => &mut self.student_dob,
            "building" => &mut self.building,
            "room" => &mut self.room,
            "studentEmail" => &mut self.student_email,
            "parentFirstName" => &mut self.parent_first_name,
            "parentLastName" => &mut self.parent_last_name,
            "parentContact" => &mut self.parent_contact,
            "parentAltContact" => &mut self.parent_alt_contact,
            "parentAddress" => &mut self.parent_address,
            "parentRelation" => &mut self.parent_relation,
            "parentEmail" => &mut self.parent_email,
            "altEmergencyName" => &mut self.alt_emergency_name,
            "altEmergencyContact" => &mut self.alt_emergency_contact,
            "otherAppliances" => &mut self.other_appliances,
            "otherAppliancesCost" => &mut self.other_appliances_cost,
            "submissionDate" => &mut self.submission_date,
            _ => return None,
        };
        Some(value)
    }

    /// Set a text field by its camelCase name
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let slot = self.field_mut(name).ok_or_else(|| FormsError::InvalidField {
            field: name.to_string(),
            reason: "unknown field".to_string(),
        })?;
        *slot = value.into();
        Ok(())
    }

    /// Select or deselect an appliance; returns whether it is now selected
    pub fn toggle_appliance(&mut self, key: &str) -> bool {
        toggle(&mut self.appliances, key)
    }

    /// Declare or withdraw a consent item; returns whether it is now declared
    pub fn toggle_consent(&mut self, key: &str) -> bool {
        toggle(&mut self.consents, key)
    }

    /// Store the signature from a capture surface (cleared when it is empty)
    pub fn capture_signature<C: SignatureCapture + ?Sized>(&mut self, capture: &C) {
        self.signature = if capture.is_empty() {
            None
        } else {
            Some(capture.to_data_url())
        };
    }

    /// Check that every required field is filled
    ///
    /// All missing fields are reported at once.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|name| self.field(name).map_or(true, |v| v.trim().is_empty()))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormsError::Validation(missing))
        }
    }

    /// Validate, then finalize
    pub fn submit(&self) -> Result<ApplicantRecord> {
        self.validate()?;
        self.finalize()
    }

    /// Build the immutable record without checking required fields
    ///
    /// Used for previews and sample downloads. Values that are present must
    /// still be well formed (building, dates, signature).
    pub fn finalize(&self) -> Result<ApplicantRecord> {
        let building = match self.building.trim() {
            "" => None,
            name => Some(name.parse::<Building>()?),
        };

        let signature = match self.signature.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(url) => Some(Signature::from_data_url(url)?),
        };

        let student_number = self.student_number.trim().to_string();
        let student_name = join_name(&self.student_first_name, &self.student_last_name);

        let other_cost = self.other_appliances_cost.trim();

        Ok(ApplicantRecord {
            filename_student_number: non_empty_or(&student_number, PLACEHOLDER_NUMBER),
            filename_student_name: non_empty_or(&student_name, PLACEHOLDER_NAME),
            student_first_name: self.student_first_name.trim().to_string(),
            student_last_name: self.student_last_name.trim().to_string(),
            student_number,
            student_dob: parse_date("studentDob", &self.student_dob)?,
            building,
            room: self.room.trim().to_string(),
            student_email: self.student_email.trim().to_string(),
            parent_first_name: self.parent_first_name.trim().to_string(),
            parent_last_name: self.parent_last_name.trim().to_string(),
            parent_contact: self.parent_contact.trim().to_string(),
            parent_alt_contact: self.parent_alt_contact.trim().to_string(),
            parent_address: self.parent_address.trim().to_string(),
            parent_relation: self.parent_relation.trim().to_string(),
            parent_email: self.parent_email.trim().to_string(),
            alt_emergency_name: self.alt_emergency_name.trim().to_string(),
            alt_emergency_contact: self.alt_emergency_contact.trim().to_string(),
            appliances: self.appliances.clone(),
            consents: self.consents.clone(),
            other_appliances: self.other_appliances.trim().to_string(),
            other_appliances_cost: (!other_cost.is_empty()).then(|| other_cost.to_string()),
            signature,
            submission_date: parse_date("submissionDate", &self.submission_date)?,
        })
    }
}

fn toggle(set: &mut BTreeSet<String>, key: &str) -> bool {
    if set.remove(key) {
        false
    } else {
        set.insert(key.to_string());
        true
    }
}

fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty_or(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

fn parse_date(field: &str, value: &str) -> Result<Option<NaiveDate>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_INPUT_FORMAT)
        .map(Some)
        .map_err(|e| FormsError::InvalidField {
            field: field.to_string(),
            reason: format!("{value:?} is not a YYYY-MM-DD date ({e})"),
        })
}

/// Finalized applicant data for one submission
///
/// Built only by [`ApplicantForm::finalize`]; shared read-only with the
/// stamping pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantRecord {
    pub student_first_name: String,
    pub student_last_name: String,
    pub student_number: String,
    pub student_dob: Option<NaiveDate>,
    pub building: Option<Building>,
    pub room: String,
    pub student_email: String,
    pub parent_first_name: String,
    pub parent_last_name: String,
    pub parent_contact: String,
    pub parent_alt_contact: String,
    pub parent_address: String,
    pub parent_relation: String,
    pub parent_email: String,
    pub alt_emergency_name: String,
    pub alt_emergency_contact: String,
    pub appliances: BTreeSet<String>,
    pub consents: BTreeSet<String>,
    pub other_appliances: String,
    /// Override cost exactly as entered
    pub other_appliances_cost: Option<String>,
    pub signature: Option<Signature>,
    pub submission_date: Option<NaiveDate>,
    /// Student number for output filenames (placeholder when empty)
    pub filename_student_number: String,
    /// Student full name for output filenames (placeholder when empty)
    pub filename_student_name: String,
}

impl ApplicantRecord {
    /// First and last name joined by a space
    pub fn student_name(&self) -> String {
        join_name(&self.student_first_name, &self.student_last_name)
    }

    pub fn parent_name(&self) -> String {
        join_name(&self.parent_first_name, &self.parent_last_name)
    }

    /// Building and room, e.g. "Narra 214"
    pub fn building_room(&self) -> String {
        let building = self.building.map(Building::name).unwrap_or_default();
        join_name(building, &self.room)
    }
}
