//! WASM bindings for residency form generation
//!
//! This crate provides JavaScript-friendly API for:
//! - Selecting a term (bundled or loaded registry)
//! - Handing over template bytes fetched by the page
//! - Computing the appliance fee total
//! - Stamping the full document set
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { FormGenerator } from 'residency-forms-wasm';
//!
//! await init();
//!
//! const generator = new FormGenerator('intersession');
//! for (const reference of generator.templateReferences()) {
//!   const bytes = await fetch('/' + reference).then((r) => r.arrayBuffer());
//!   generator.loadTemplate(reference, new Uint8Array(bytes));
//! }
//!
//! const documents = generator.generateAll(form, false);
//! for (const doc of documents) {
//!   if (doc.error) console.warn(doc.code, doc.error);
//!   else download(doc.filename, doc.bytes);
//! }
//! ```

use forms::{ApplicantForm, MemorySource, Orchestrator, Registry, TermConfig};
use js_sys::{Array, Object, Reflect, Uint8Array};
use std::collections::BTreeSet;
use std::fmt::Display;
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

/// Residency document set generator for one term
#[wasm_bindgen]
pub struct FormGenerator {
    registry: Registry,
    term: String,
    source: MemorySource,
}

#[wasm_bindgen]
impl FormGenerator {
    /// Create a generator using the bundled registries
    ///
    /// @param term - Term id ("intersession" or "regular")
    #[wasm_bindgen(constructor)]
    pub fn new(term: &str) -> Result<FormGenerator, JsValue> {
        Self::with_registry(Registry::bundled().map_err(js_error)?, term).map_err(js_error)
    }

    /// Load additional terms from registry JSON (one term or an array)
    ///
    /// Terms with an existing id replace the bundled ones.
    #[wasm_bindgen(js_name = loadRegistry)]
    pub fn load_registry(&mut self, json: &str) -> Result<(), JsValue> {
        self.registry.load_json_str(json).map_err(js_error)
    }

    /// Switch to another term
    #[wasm_bindgen(js_name = setTerm)]
    pub fn set_term(&mut self, term: &str) -> Result<(), JsValue> {
        self.registry.term(term).map_err(js_error)?;
        self.term = term.to_string();
        Ok(())
    }

    /// Label of the current term
    pub fn label(&self) -> Result<String, JsValue> {
        Ok(self.current().map_err(js_error)?.label.clone())
    }

    /// References the page must fetch and pass to `loadTemplate`
    ///
    /// @returns Array of template (and font) paths not loaded yet
    #[wasm_bindgen(js_name = templateReferences)]
    pub fn template_references(&self) -> Result<Vec<JsValue>, JsValue> {
        Ok(self
            .missing_references()
            .map_err(js_error)?
            .into_iter()
            .map(|r| JsValue::from_str(&r))
            .collect())
    }

    /// Provide fetched template or font bytes
    ///
    /// @param reference - Path as listed by `templateReferences`
    /// @param data - File bytes (Uint8Array)
    #[wasm_bindgen(js_name = loadTemplate)]
    pub fn load_template(&mut self, reference: &str, data: &[u8]) {
        self.source.insert(reference, data.to_vec());
    }

    /// Fee schedule of the current term as `{ key: fee }`
    #[wasm_bindgen(js_name = feeSchedule)]
    pub fn fee_schedule(&self) -> Result<JsValue, JsValue> {
        let term = self.current().map_err(js_error)?;
        Ok(serde_wasm_bindgen::to_value(&term.fees)?)
    }

    /// Fee total for the form's appliances and "other" cost
    ///
    /// @param form - Applicant form object (camelCase keys)
    #[wasm_bindgen(js_name = totalFee)]
    pub fn total_fee(&self, form: JsValue) -> Result<f64, JsValue> {
        let form: ApplicantForm = serde_wasm_bindgen::from_value(form)?;
        let total = self.fee_for(&form).map_err(js_error)?;
        Ok(total as f64)
    }

    /// Names of the required fields that are still empty
    #[wasm_bindgen(js_name = missingFields)]
    pub fn missing_fields(form: JsValue) -> Result<Vec<JsValue>, JsValue> {
        let form: ApplicantForm = serde_wasm_bindgen::from_value(form)?;
        Ok(missing(&form)
            .into_iter()
            .map(|name| JsValue::from_str(&name))
            .collect())
    }

    /// Stamp every document of the current term
    ///
    /// @param form - Applicant form object; `signature` is an image data URL
    /// @param preview - Skip required-field validation (sample download)
    /// @returns Array of `{ code, title, filename, bytes? , error? }`
    #[wasm_bindgen(js_name = generateAll)]
    pub fn generate_all(&self, form: JsValue, preview: bool) -> Result<Array, JsValue> {
        let form: ApplicantForm = serde_wasm_bindgen::from_value(form)?;
        let record = if preview {
            form.finalize()
        } else {
            form.submit()
        }
        .map_err(js_error)?;

        let term = self.current().map_err(js_error)?;
        let output = Array::new();
        for document in Orchestrator::new(term, &self.source).generate_all(&record) {
            let entry = Object::new();
            set(&entry, "code", &JsValue::from_str(&document.code))?;
            set(&entry, "title", &JsValue::from_str(&document.title))?;
            set(&entry, "filename", &JsValue::from_str(&document.filename))?;
            match &document.result {
                Ok(bytes) => set(&entry, "bytes", &Uint8Array::from(bytes.as_slice()).into())?,
                Err(e) => set(&entry, "error", &js_error(e))?,
            }
            output.push(&entry);
        }
        Ok(output)
    }
}

impl FormGenerator {
    fn with_registry(registry: Registry, term: &str) -> forms::Result<Self> {
        registry.term(term)?;
        Ok(Self {
            registry,
            term: term.to_string(),
            source: MemorySource::new(),
        })
    }

    fn current(&self) -> forms::Result<&TermConfig> {
        self.registry.term(&self.term)
    }

    fn missing_references(&self) -> forms::Result<Vec<String>> {
        let term = self.current()?;
        let mut seen = BTreeSet::new();
        Ok(term
            .documents
            .iter()
            .map(|d| d.template.as_str())
            .chain(term.font.source.as_deref())
            .filter(|r| !self.source.contains(r) && seen.insert(*r))
            .map(str::to_string)
            .collect())
    }

    fn fee_for(&self, form: &ApplicantForm) -> forms::Result<u64> {
        let term = self.current()?;
        Ok(term
            .fees
            .total_fee(&form.appliances, Some(form.other_appliances_cost.as_str())))
    }
}

fn missing(form: &ApplicantForm) -> Vec<String> {
    match form.validate() {
        Err(forms::FormsError::Validation(fields)) => fields,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn generator() -> FormGenerator {
        FormGenerator::with_registry(Registry::bundled().unwrap(), "intersession").unwrap()
    }

    #[wasm_bindgen_test]
    fn test_unknown_term_rejected() {
        assert!(FormGenerator::with_registry(Registry::bundled().unwrap(), "summer").is_err());
    }

    #[wasm_bindgen_test]
    fn test_references_shrink_as_templates_load() {
        let mut generator = generator();
        let references = generator.missing_references().unwrap();
        assert_eq!(references.len(), 5);

        generator.load_template(&references[0], vec![0u8; 4].as_slice());
        assert_eq!(generator.missing_references().unwrap().len(), 4);
    }

    #[wasm_bindgen_test]
    fn test_shared_references_listed_once() {
        let registry = Registry::from_json_str(
            r#"{
                "term": "summer",
                "font": { "family": "Sarabun", "source": "forms/shared.pdf" },
                "documents": [
                    { "code": "ADF", "template": "forms/shared.pdf" },
                    { "code": "TC", "template": "forms/tc.pdf" },
                    { "code": "RA", "template": "forms/shared.pdf" }
                ]
            }"#,
        )
        .unwrap();
        let generator = FormGenerator::with_registry(registry, "summer").unwrap();

        assert_eq!(
            generator.missing_references().unwrap(),
            vec!["forms/shared.pdf".to_string(), "forms/tc.pdf".to_string()]
        );
    }

    #[wasm_bindgen_test]
    fn test_fee_for_form() {
        let mut form = ApplicantForm::new();
        form.toggle_appliance("hairDryer");
        form.toggle_appliance("airFryer");
        assert_eq!(generator().fee_for(&form).unwrap(), 3500);

        form.other_appliances_cost = "1,000".to_string();
        assert_eq!(generator().fee_for(&form).unwrap(), 4500);
    }

    #[wasm_bindgen_test]
    fn test_missing_fields() {
        let mut form = ApplicantForm::new();
        form.set_field("studentFirstName", "Juan").unwrap();
        let fields = missing(&form);
        assert!(!fields.contains(&"studentFirstName".to_string()));
        assert!(fields.contains(&"studentLastName".to_string()));
    }
}
