//! Document set generation

use crate::format::render_filename;
use crate::schema::{DocumentDescriptor, TermConfig};
use crate::stamper::Stamper;
use crate::{ApplicantRecord, FormsError, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Where template (and font) bytes come from
pub trait TemplateSource {
    /// Fetch the bytes behind a registry reference
    ///
    /// Fails with [`FormsError::TemplateUnavailable`] when the reference
    /// cannot be resolved.
    fn fetch(&self, reference: &str) -> Result<Vec<u8>>;
}

/// Templates read from a directory (references are relative paths)
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirectorySource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.root.join(reference);
        std::fs::read(&path).map_err(|e| FormsError::TemplateUnavailable {
            reference: reference.to_string(),
            reason: format!("{}: {e}", path.display()),
        })
    }
}

/// Templates held in memory, e.g. fetched by a host application
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(reference.into(), bytes);
    }

    /// Builder-style insert
    pub fn with(mut self, reference: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(reference, bytes);
        self
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.files.contains_key(reference)
    }
}

impl TemplateSource for MemorySource {
    fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        self.files
            .get(reference)
            .cloned()
            .ok_or_else(|| FormsError::TemplateUnavailable {
                reference: reference.to_string(),
                reason: "not loaded".to_string(),
            })
    }
}

/// Outcome for one document of the set
#[derive(Debug)]
pub struct GeneratedDocument {
    pub code: String,
    pub title: String,
    /// Output filename (also set when stamping failed)
    pub filename: String,
    pub result: Result<Vec<u8>>,
}

impl GeneratedDocument {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Produces the full document set of a term for one record
pub struct Orchestrator<'a, S: TemplateSource + ?Sized> {
    term: &'a TermConfig,
    source: &'a S,
}

impl<'a, S: TemplateSource + ?Sized> Orchestrator<'a, S> {
    pub fn new(term: &'a TermConfig, source: &'a S) -> Self {
        Self { term, source }
    }

    /// Stamp every document of the term, in registry order
    ///
    /// A failing document is reported in its own entry and does not stop
    /// the others.
    pub fn generate_all(&self, record: &ApplicantRecord) -> Vec<GeneratedDocument> {
        info!(
            "generating {} documents for term {}",
            self.term.documents.len(),
            self.term.term
        );

        let documents: Vec<GeneratedDocument> = self
            .term
            .documents
            .iter()
            .map(|document| self.generate(document, record))
            .collect();

        let failed = documents.iter().filter(|d| !d.is_ok()).count();
        if failed > 0 {
            warn!("{failed} of {} documents failed", documents.len());
        }
        documents
    }

    /// Stamp a single document by code
    pub fn generate_one(&self, code: &str, record: &ApplicantRecord) -> Result<GeneratedDocument> {
        let document = self
            .term
            .document(code)
            .ok_or_else(|| FormsError::UnknownDocument(code.to_string()))?;
        Ok(self.generate(document, record))
    }

    fn generate(&self, document: &DocumentDescriptor, record: &ApplicantRecord) -> GeneratedDocument {
        let filename = render_filename(&document.filename, &document.code, record);
        let result = self.stamp(document, record);

        match &result {
            Ok(bytes) => info!("{}: {} ({} bytes)", document.code, filename, bytes.len()),
            Err(e) => warn!("{}: {e}", document.code),
        }

        GeneratedDocument {
            code: document.code.clone(),
            title: document.title.clone(),
            filename,
            result,
        }
    }

    fn stamp(&self, document: &DocumentDescriptor, record: &ApplicantRecord) -> Result<Vec<u8>> {
        let template = self.source.fetch(&document.template)?;
        let font_data = match &self.term.font.source {
            Some(reference) => Some(self.source.fetch(reference)?),
            None => None,
        };

        let mut stamper = Stamper::new(self.term);
        if let Some(data) = &font_data {
            stamper = stamper.with_font_data(data);
        }
        stamper.stamp(document, &template, record)
    }
}
