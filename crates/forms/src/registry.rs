//! Term registries: loading and validation

use crate::format::check_date_format;
use crate::schema::{Field, FontDef, Placement, TermConfig};
use crate::{FormsError, Result};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

const BUNDLED_TERMS: &[&str] = &[
    include_str!("../data/terms/intersession.json"),
    include_str!("../data/terms/regular.json"),
];

/// All known terms, keyed by term id
#[derive(Debug, Clone, Default)]
pub struct Registry {
    terms: BTreeMap<String, TermConfig>,
}

impl Registry {
    /// The terms shipped with the crate ("intersession", "regular")
    pub fn bundled() -> Result<Self> {
        let mut registry = Self::default();
        for json in BUNDLED_TERMS {
            registry.load_json_str(json)?;
        }
        Ok(registry)
    }

    /// Parse a registry from JSON (one term object or an array of terms)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut registry = Self::default();
        registry.load_json_str(json)?;
        Ok(registry)
    }

    /// Add the terms of a JSON document, replacing terms with the same id
    pub fn load_json_str(&mut self, json: &str) -> Result<()> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| FormsError::Registry(e.to_string()))?;
        let terms: Vec<TermConfig> = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|term| vec![term])
        }
        .map_err(|e| FormsError::Registry(e.to_string()))?;
        for term in terms {
            self.insert(term)?;
        }
        Ok(())
    }

    /// Validate and add a term
    pub fn insert(&mut self, term: TermConfig) -> Result<()> {
        validate_term(&term)?;
        debug!(
            "registered term {} with {} documents",
            term.term,
            term.documents.len()
        );
        self.terms.insert(term.term.clone(), term);
        Ok(())
    }

    pub fn term(&self, id: &str) -> Result<&TermConfig> {
        self.terms
            .get(id)
            .ok_or_else(|| FormsError::UnknownTerm(id.to_string()))
    }

    /// Terms in id order
    pub fn terms(&self) -> impl Iterator<Item = &TermConfig> {
        self.terms.values()
    }

    /// Placements for a document of a term
    pub fn placements_for(&self, term: &str, code: &str) -> Result<&[Placement]> {
        let term = self.term(term)?;
        term.document(code)
            .map(|d| d.placements.as_slice())
            .ok_or_else(|| FormsError::UnknownDocument(code.to_string()))
    }
}

/// Structural checks applied when a term is loaded
pub fn validate_term(term: &TermConfig) -> Result<()> {
    let fail = |msg: String| Err(FormsError::Registry(format!("term {:?}: {msg}", term.term)));

    if term.term.trim().is_empty() {
        return fail("term id is empty".to_string());
    }
    check_date_format(&term.date_format)?;
    validate_font(&term.font).or_else(fail)?;

    for (key, fee) in term.fees.iter() {
        if fee == 0 {
            return fail(format!("fee for {key:?} must be positive"));
        }
    }

    let mut codes = BTreeSet::new();
    for doc in &term.documents {
        if doc.code.trim().is_empty() {
            return fail("document code is empty".to_string());
        }
        if !codes.insert(doc.code.as_str()) {
            return fail(format!("duplicate document code {:?}", doc.code));
        }
        if doc.template.trim().is_empty() {
            return fail(format!("{}: template reference is empty", doc.code));
        }
        for placement in &doc.placements {
            validate_placement(placement)
                .or_else(|msg| fail(format!("{}: {}: {msg}", doc.code, placement.describe())))?;
        }
    }

    Ok(())
}

fn validate_font(font: &FontDef) -> std::result::Result<(), String> {
    if font.family.trim().is_empty() {
        return Err("font family is empty".to_string());
    }
    if font.source.is_none() && pdf_core::StandardFont::from_name(&font.family).is_none() {
        return Err(format!(
            "font {:?} is not a standard font and has no source",
            font.family
        ));
    }
    Ok(())
}

fn validate_placement(placement: &Placement) -> std::result::Result<(), String> {
    let position = placement.position();
    if !position.x.is_finite() || !position.y.is_finite() {
        return Err("position must be finite".to_string());
    }

    match placement {
        Placement::Text(p) => {
            check_size(p.size)?;
            if p.field == Field::Static && p.text.as_deref().unwrap_or("").is_empty() {
                return Err("static text is empty".to_string());
            }
        }
        Placement::Mark(p) => {
            check_size(p.size)?;
            if p.key.trim().is_empty() {
                return Err("mark key is empty".to_string());
            }
            if p.glyph.is_empty() {
                return Err("mark glyph is empty".to_string());
            }
        }
        Placement::Signature(p) => {
            if !(p.width.is_finite() && p.width > 0.0 && p.height.is_finite() && p.height > 0.0) {
                return Err(format!(
                    "signature box {}x{} must be positive",
                    p.width, p.height
                ));
            }
        }
    }
    Ok(())
}

fn check_size(size: f32) -> std::result::Result<(), String> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(format!("font size {size} must be positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MarkGroup;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"{
        "term": "summer",
        "label": "Summer 2026",
        "fees": { "hairDryer": 1500 },
        "documents": [
            { "code": "ADF", "template": "forms/adf.pdf", "placements": [
                { "type": "text", "field": "studentName", "position": { "x": 100, "y": 700 } }
            ]}
        ]
    }"#;

    #[test]
    fn test_bundled_terms() {
        let registry = Registry::bundled().unwrap();
        let ids: Vec<&str> = registry.terms().map(|t| t.term.as_str()).collect();
        assert_eq!(ids, vec!["intersession", "regular"]);

        for term in registry.terms() {
            let codes: Vec<&str> = term.documents.iter().map(|d| d.code.as_str()).collect();
            assert_eq!(codes, vec!["ADF", "TC", "RA", "DPP", "CF"]);
        }
    }

    #[test]
    fn test_bundled_intersession_fees() {
        let registry = Registry::bundled().unwrap();
        let term = registry.term("intersession").unwrap();
        assert_eq!(term.fees.fee("hairDryer"), 1500);
        assert_eq!(term.fees.fee("airFryer"), 2000);

        let regular = registry.term("regular").unwrap();
        assert!(regular.fees.fee("hairDryer") > term.fees.fee("hairDryer"));
    }

    #[test]
    fn test_bundled_marks_reference_known_fees() {
        let registry = Registry::bundled().unwrap();
        for term in registry.terms() {
            for placement in term.placements_for("ADF") {
                if let Placement::Mark(mark) = placement {
                    if mark.group == MarkGroup::Appliance {
                        assert!(term.fees.contains(&mark.key), "{} lacks fee for {}", term.term, mark.key);
                    }
                }
            }
        }
    }

    #[test]
    fn test_from_json_str_single_term() {
        let registry = Registry::from_json_str(MINIMAL).unwrap();
        let placements = registry.placements_for("summer", "ADF").unwrap();

        assert_eq!(placements.len(), 1);
        assert!(matches!(&placements[0], Placement::Text(p) if p.field == Field::StudentName));
    }

    #[test]
    fn test_from_json_str_term_list() {
        let json = format!("[{MINIMAL}]");
        assert!(Registry::from_json_str(&json).unwrap().term("summer").is_ok());
    }

    #[test]
    fn test_unknown_term_and_document() {
        let registry = Registry::from_json_str(MINIMAL).unwrap();
        assert!(matches!(registry.term("winter"), Err(FormsError::UnknownTerm(_))));
        assert!(matches!(
            registry.placements_for("summer", "XYZ"),
            Err(FormsError::UnknownDocument(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            Registry::from_json_str("{ not json"),
            Err(FormsError::Registry(_))
        ));
    }

    fn rejects(json: &str) -> String {
        match Registry::from_json_str(json) {
            Err(FormsError::Registry(msg)) => msg,
            other => panic!("Expected registry error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_duplicate_codes() {
        let msg = rejects(
            r#"{ "term": "t", "documents": [
                { "code": "ADF", "template": "a.pdf" },
                { "code": "ADF", "template": "b.pdf" }
            ]}"#,
        );
        assert!(msg.contains("duplicate document code"));
    }

    #[test]
    fn test_validation_zero_fee() {
        let msg = rejects(r#"{ "term": "t", "fees": { "fan": 0 }, "documents": [] }"#);
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_validation_font_size() {
        let msg = rejects(
            r#"{ "term": "t", "documents": [{ "code": "ADF", "template": "a.pdf", "placements": [
                { "type": "text", "field": "room", "size": 0, "position": { "x": 1, "y": 1 } }
            ]}]}"#,
        );
        assert!(msg.contains("font size"));
    }

    #[test]
    fn test_validation_signature_box() {
        let msg = rejects(
            r#"{ "term": "t", "documents": [{ "code": "ADF", "template": "a.pdf", "placements": [
                { "type": "signature", "width": -5, "position": { "x": 1, "y": 1 } }
            ]}]}"#,
        );
        assert!(msg.contains("signature box"));
    }

    #[test]
    fn test_validation_negative_page_rejected_by_parser() {
        let msg = rejects(
            r#"{ "term": "t", "documents": [{ "code": "ADF", "template": "a.pdf", "placements": [
                { "type": "signature", "page": -1, "position": { "x": 1, "y": 1 } }
            ]}]}"#,
        );
        assert!(!msg.is_empty());
    }

    #[test]
    fn test_validation_unknown_standard_font() {
        let msg = rejects(r#"{ "term": "t", "font": { "family": "Comic" }, "documents": [] }"#);
        assert!(msg.contains("not a standard font"));
    }

    #[test]
    fn test_validation_time_only_date_format() {
        let msg = rejects(
            r#"{ "term": "t", "dateFormat": "%H:%M", "documents": [{ "code": "ADF", "template": "a.pdf", "placements": [
                { "type": "text", "field": "submissionDate", "position": { "x": 1, "y": 1 } }
            ]}]}"#,
        );
        assert!(msg.contains("invalid date format"));
    }

    #[test]
    fn test_validation_date_format() {
        let msg = rejects(r#"{ "term": "t", "dateFormat": "%Q", "documents": [] }"#);
        assert!(msg.contains("invalid date format"));
    }
}
