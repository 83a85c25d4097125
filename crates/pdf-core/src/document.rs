//! PDF Document wrapper

use crate::font::{Font, StandardFont, TrueTypeFont};
use crate::image::{
    calculate_scaled_dimensions, generate_image_operators, ImageScaleMode, ImageXObject,
};
use crate::text::{generate_text_operators, TextRenderContext};
use crate::{Align, PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Parent chain depth limit when looking up inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 16;

/// RGB Color (values 0.0 - 1.0)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Create a new RGB color (values 0.0 - 1.0)
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create color from RGB values (0-255)
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Black color
    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Page rectangle in PDF points, normalized so `left <= right` and `bottom <= top`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl PageBox {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Whether a point lies inside the box (edges included)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }
}

/// An image already added to the document
#[derive(Debug, Clone, Copy)]
struct EmbeddedImage {
    object_id: ObjectId,
    width: u32,
    height: u32,
}

/// PDF Document wrapper providing high-level operations
///
/// Drawing calls are buffered per page and written out by `to_bytes` / `save`.
/// All bookkeeping uses ordered maps so identical call sequences serialize to
/// identical bytes.
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Registered fonts by name
    fonts: BTreeMap<String, Font>,
    /// Current font name
    current_font: Option<String>,
    /// Current font size
    current_font_size: f32,
    /// Current text color
    current_text_color: Color,
    /// Embedded images (data hash -> object)
    embedded_images: BTreeMap<u64, EmbeddedImage>,
    /// Font resources added per page (page index -> font name -> resource name)
    page_fonts: BTreeMap<usize, BTreeMap<String, String>>,
    /// Image resources added per page (page index -> resource name -> object ID)
    page_images: BTreeMap<usize, BTreeMap<String, ObjectId>>,
    /// Buffered content operators per page
    page_content_buffer: BTreeMap<usize, Vec<u8>>,
}

impl PdfDocument {
    fn from_inner(inner: Document) -> Self {
        Self {
            inner,
            fonts: BTreeMap::new(),
            current_font: None,
            current_font_size: 12.0,
            current_text_color: Color::default(),
            embedded_images: BTreeMap::new(),
            page_fonts: BTreeMap::new(),
            page_images: BTreeMap::new(),
            page_content_buffer: BTreeMap::new(),
        }
    }

    /// Open a PDF document from a file path
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("template.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let inner = Document::load(path).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    /// Open a PDF document from bytes
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        Ok(Self::from_inner(inner))
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Object ID of the page at a 0-based index
    fn page_id(&self, page_index: usize) -> Result<ObjectId> {
        let pages = self.inner.get_pages();
        u32::try_from(page_index)
            .ok()
            .and_then(|index| index.checked_add(1))
            .and_then(|number| pages.get(&number).copied())
            .ok_or(PdfError::InvalidPage(page_index, pages.len()))
    }

    /// Page MediaBox, inherited from the page tree when the page has none
    pub fn page_box(&self, page_index: usize) -> Result<PageBox> {
        let page_id = self.page_id(page_index)?;
        let media_box = self.get_inherited_media_box(page_id)?;
        if media_box.len() < 4 {
            return Err(PdfError::ParseError("Invalid MediaBox format".to_string()));
        }

        let mut coords = [0.0f64; 4];
        for (slot, obj) in coords.iter_mut().zip(&media_box) {
            *slot = object_to_f64(self.resolve(obj)?)
                .ok_or_else(|| PdfError::ParseError("Invalid MediaBox value".to_string()))?;
        }

        let [x1, y1, x2, y2] = coords;
        Ok(PageBox {
            left: x1.min(x2),
            bottom: y1.min(y2),
            right: x1.max(x2),
            top: y1.max(y2),
        })
    }

    /// Page width and height in points
    pub fn page_size(&self, page_index: usize) -> Result<(f64, f64)> {
        let page_box = self.page_box(page_index)?;
        Ok((page_box.width(), page_box.height()))
    }

    /// Register one of the standard Type1 fonts
    ///
    /// Standard fonts are referenced by name and never embedded. Registering
    /// the same font twice is a no-op. Returns the name to pass to `set_font`.
    pub fn use_standard_font(&mut self, font: StandardFont) -> &'static str {
        let name = font.base_font();
        self.fonts
            .entry(name.to_string())
            .or_insert(Font::Standard(font));
        name
    }

    /// Add a TrueType font to the document
    ///
    /// # Arguments
    /// * `name` - Font identifier (used in set_font)
    /// * `ttf_data` - TrueType font file bytes
    pub fn add_font(&mut self, name: &str, ttf_data: &[u8]) -> Result<()> {
        if self.fonts.contains_key(name) {
            return Err(PdfError::FontAlreadyExists(name.to_string()));
        }

        let font = TrueTypeFont::from_ttf(name, ttf_data)?;
        self.fonts.insert(name.to_string(), Font::TrueType(font));
        Ok(())
    }

    /// Set current font and size
    ///
    /// Standard font names ("Helvetica", "Courier") are registered on first use.
    pub fn set_font(&mut self, name: &str, size: f32) -> Result<()> {
        let name = if self.fonts.contains_key(name) {
            name.to_string()
        } else if let Some(standard) = StandardFont::from_name(name) {
            self.use_standard_font(standard).to_string()
        } else {
            return Err(PdfError::FontNotFound(name.to_string()));
        };

        self.current_font = Some(name);
        self.current_font_size = size;
        Ok(())
    }

    /// Set current text color
    pub fn set_text_color(&mut self, color: Color) {
        self.current_text_color = color;
    }

    fn current_font(&self) -> Result<(&str, &Font)> {
        let name = self
            .current_font
            .as_deref()
            .ok_or_else(|| PdfError::FontNotFound("No font set".to_string()))?;
        let font = self
            .fonts
            .get(name)
            .ok_or_else(|| PdfError::FontNotFound(name.to_string()))?;
        Ok((name, font))
    }

    /// Width of `text` in points with the current font and size
    ///
    /// # Example
    /// ```ignore
    /// doc.set_font("Helvetica", 10.0)?;
    /// let width = doc.text_width("Juan")?; // 21.68
    /// ```
    pub fn text_width(&self, text: &str) -> Result<f64> {
        let (_, font) = self.current_font()?;
        Ok(font.text_width_points(text, self.current_font_size) as f64)
    }

    /// Insert text with its baseline anchored at `(x, y)`
    ///
    /// # Arguments
    /// * `text` - Text to insert
    /// * `page_index` - Page index (0-based)
    /// * `x` - Anchor X in points (from left)
    /// * `y` - Baseline Y in points (from bottom)
    /// * `align` - How the text is placed relative to `x`
    pub fn insert_text(
        &mut self,
        text: &str,
        page_index: usize,
        x: f64,
        y: f64,
        align: Align,
    ) -> Result<()> {
        self.page_id(page_index)?;

        // Skip empty text - nothing to render
        if text.is_empty() {
            return Ok(());
        }

        let (font_name, font) = self.current_font()?;
        let font_name = font_name.to_string();
        let width = font.text_width_points(text, self.current_font_size) as f64;
        let text_hex = font.encode_text_hex(text);

        if let Some(font) = self.fonts.get_mut(&font_name) {
            font.record_usage(text);
        }

        let resource_name = self.font_resource(page_index, &font_name)?;
        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size: self.current_font_size,
            color: self.current_text_color,
        };

        let operators = generate_text_operators(&text_hex, align.start_x(x, width), y, &ctx);
        self.buffer_content(page_index, &operators);

        Ok(())
    }

    /// Insert an image stretched to `width` x `height` with its lower-left
    /// corner at `(x, y)`
    pub fn insert_image(
        &mut self,
        data: &[u8],
        page_index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.insert_image_scaled(data, page_index, x, y, width, height, ImageScaleMode::Stretch)
    }

    /// Insert an image with scaling mode
    ///
    /// The scaled image keeps its lower-left corner at `(x, y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_image_scaled(
        &mut self,
        data: &[u8],
        page_index: usize,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        mode: ImageScaleMode,
    ) -> Result<()> {
        self.page_id(page_index)?;

        let image = self.embed_image(data)?;
        let resource_name = self.image_resource(page_index, image.object_id)?;

        let (actual_width, actual_height) =
            calculate_scaled_dimensions(image.width, image.height, width, height, mode);

        let operators =
            generate_image_operators(&resource_name, x, y, actual_width, actual_height);
        self.buffer_content(page_index, &operators);

        Ok(())
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.finalize()?;
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;

        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Get a reference to the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Write fonts, page resources and buffered content into the document
    fn finalize(&mut self) -> Result<()> {
        let page_fonts = std::mem::take(&mut self.page_fonts);
        let page_images = std::mem::take(&mut self.page_images);

        let font_ids = self.embed_fonts(&page_fonts)?;

        let pages: BTreeSet<usize> = page_fonts.keys().chain(page_images.keys()).copied().collect();
        for page_index in pages {
            let mut fonts = Vec::new();
            for (font_name, resource_name) in page_fonts.get(&page_index).into_iter().flatten() {
                let id = font_ids
                    .get(font_name)
                    .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;
                fonts.push((resource_name.clone(), *id));
            }
            let images: Vec<(String, ObjectId)> = page_images
                .get(&page_index)
                .into_iter()
                .flatten()
                .map(|(name, id)| (name.clone(), *id))
                .collect();

            self.add_page_resources(page_index, &fonts, &images)?;
        }

        let buffers = std::mem::take(&mut self.page_content_buffer);
        for (page_index, content) in buffers {
            if !content.is_empty() {
                self.append_to_content_stream(page_index, &content)?;
            }
        }

        Ok(())
    }

    /// Add font objects for every font referenced from a page
    fn embed_fonts(
        &mut self,
        page_fonts: &BTreeMap<usize, BTreeMap<String, String>>,
    ) -> Result<BTreeMap<String, ObjectId>> {
        let used: BTreeSet<&String> = page_fonts.values().flat_map(|fonts| fonts.keys()).collect();

        let mut ids = BTreeMap::new();
        for font_name in used {
            let font = self
                .fonts
                .get(font_name)
                .ok_or_else(|| PdfError::FontNotFound(font_name.clone()))?;

            let id = match font {
                Font::Standard(standard) => self.inner.add_object(standard.to_pdf_object()),
                Font::TrueType(ttf) => {
                    let font_objects = ttf.to_pdf_objects();

                    let font_file_id = self.inner.add_object(font_objects.font_file_stream);

                    let mut font_descriptor = font_objects.font_descriptor;
                    font_descriptor.set("FontFile2", Object::Reference(font_file_id));
                    let font_descriptor_id = self.inner.add_object(font_descriptor);

                    let mut cid_font = font_objects.cid_font;
                    cid_font.set("FontDescriptor", Object::Reference(font_descriptor_id));
                    let cid_font_id = self.inner.add_object(cid_font);

                    let tounicode_id = self.inner.add_object(font_objects.tounicode_stream);

                    let mut type0_font = font_objects.type0_font;
                    type0_font.set(
                        "DescendantFonts",
                        Object::Array(vec![Object::Reference(cid_font_id)]),
                    );
                    type0_font.set("ToUnicode", Object::Reference(tounicode_id));
                    self.inner.add_object(type0_font)
                }
            };
            ids.insert(font_name.clone(), id);
        }

        Ok(ids)
    }

    /// Add an image XObject (and its soft mask) once per distinct image
    fn embed_image(&mut self, data: &[u8]) -> Result<EmbeddedImage> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let data_hash = hasher.finish();

        if let Some(image) = self.embedded_images.get(&data_hash) {
            return Ok(*image);
        }

        let xobject = ImageXObject::from_bytes(data)?;
        let soft_mask = xobject
            .soft_mask_stream()
            .map(|stream| self.inner.add_object(stream));
        let object_id = self.inner.add_object(xobject.to_pdf_stream(soft_mask));

        let image = EmbeddedImage {
            object_id,
            width: xobject.width,
            height: xobject.height,
        };
        self.embedded_images.insert(data_hash, image);
        Ok(image)
    }

    /// Resource name for a font on a page, allocated on first use
    fn font_resource(&mut self, page_index: usize, font_name: &str) -> Result<String> {
        if let Some(name) = self
            .page_fonts
            .get(&page_index)
            .and_then(|fonts| fonts.get(font_name))
        {
            return Ok(name.clone());
        }

        let mut taken = self.existing_resource_names(page_index, b"Font")?;
        if let Some(fonts) = self.page_fonts.get(&page_index) {
            taken.extend(fonts.values().cloned());
        }
        let name = next_free_name("F", &taken);

        self.page_fonts
            .entry(page_index)
            .or_default()
            .insert(font_name.to_string(), name.clone());
        Ok(name)
    }

    /// Resource name for an image on a page, allocated on first use
    fn image_resource(&mut self, page_index: usize, object_id: ObjectId) -> Result<String> {
        if let Some((name, _)) = self
            .page_images
            .get(&page_index)
            .and_then(|images| images.iter().find(|(_, id)| **id == object_id))
        {
            return Ok(name.clone());
        }

        let mut taken = self.existing_resource_names(page_index, b"XObject")?;
        if let Some(images) = self.page_images.get(&page_index) {
            taken.extend(images.keys().cloned());
        }
        let name = next_free_name("Im", &taken);

        self.page_images
            .entry(page_index)
            .or_default()
            .insert(name.clone(), object_id);
        Ok(name)
    }

    /// Names already used in one resource category of a page
    fn existing_resource_names(&self, page_index: usize, category: &[u8]) -> Result<BTreeSet<String>> {
        let page_id = self.page_id(page_index)?;
        let resources = self.effective_resources(page_id)?;
        let dict = self.resource_category(&resources, category)?;
        Ok(dict
            .iter()
            .map(|(name, _)| String::from_utf8_lossy(name).into_owned())
            .collect())
    }

    /// Page Resources, resolved through references and the page tree
    fn effective_resources(&self, page_id: ObjectId) -> Result<Dictionary> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self.inner.get_object(current_id)?.as_dict()?;

            if let Ok(resources) = dict.get(b"Resources") {
                return match self.resolve(resources)? {
                    Object::Dictionary(resources) => Ok(resources.clone()),
                    _ => Err(PdfError::ParseError(
                        "Resources is not a dictionary".to_string(),
                    )),
                };
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        Ok(Dictionary::new())
    }

    /// One category (Font, XObject, ...) of a Resources dictionary
    fn resource_category(&self, resources: &Dictionary, category: &[u8]) -> Result<Dictionary> {
        match resources.get(category) {
            Ok(obj) => match self.resolve(obj)? {
                Object::Dictionary(dict) => Ok(dict.clone()),
                _ => Err(PdfError::ParseError(format!(
                    "{} resources are not a dictionary",
                    String::from_utf8_lossy(category)
                ))),
            },
            Err(_) => Ok(Dictionary::new()),
        }
    }

    /// Merge new font and image entries into a page's Resources
    ///
    /// The merged dictionary is written inline on the page, so shared or
    /// inherited resource objects of the template stay untouched.
    fn add_page_resources(
        &mut self,
        page_index: usize,
        fonts: &[(String, ObjectId)],
        images: &[(String, ObjectId)],
    ) -> Result<()> {
        let page_id = self.page_id(page_index)?;
        let mut resources = self.effective_resources(page_id)?;

        for (category, entries) in [(&b"Font"[..], fonts), (&b"XObject"[..], images)] {
            if entries.is_empty() {
                continue;
            }
            let mut dict = self.resource_category(&resources, category)?;
            for (name, id) in entries {
                dict.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set(category, Object::Dictionary(dict));
        }

        let page_dict = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        page_dict.set("Resources", Object::Dictionary(resources));

        Ok(())
    }

    /// Get MediaBox, following parent inheritance chain if needed
    fn get_inherited_media_box(&self, page_id: ObjectId) -> Result<Vec<Object>> {
        let mut current_id = page_id;

        for _ in 0..MAX_INHERITANCE_DEPTH {
            let dict = self
                .inner
                .get_object(current_id)?
                .as_dict()
                .map_err(|_| PdfError::ParseError("Object is not a dictionary".to_string()))?;

            if let Ok(media_box) = dict.get(b"MediaBox") {
                return match self.resolve(media_box)? {
                    Object::Array(arr) => Ok(arr.clone()),
                    _ => Err(PdfError::ParseError("MediaBox is not an array".to_string())),
                };
            }

            match dict.get(b"Parent") {
                Ok(Object::Reference(parent_id)) => current_id = *parent_id,
                _ => break,
            }
        }

        // Fallback: US Letter, the PDF default page size
        Ok(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ])
    }

    /// Follow a single indirect reference
    fn resolve<'a>(&'a self, obj: &'a Object) -> Result<&'a Object> {
        match obj {
            Object::Reference(id) => Ok(self.inner.get_object(*id)?),
            other => Ok(other),
        }
    }

    /// Buffer content operators for a page (written at save time)
    fn buffer_content(&mut self, page_index: usize, content: &[u8]) {
        self.page_content_buffer
            .entry(page_index)
            .or_default()
            .extend_from_slice(content);
    }

    /// Append content after a page's existing content streams
    ///
    /// Existing streams are kept as they are and bracketed by `q` / `Q`, so
    /// any graphics state the template leaves behind does not leak into the
    /// appended operators.
    fn append_to_content_stream(&mut self, page_index: usize, content: &[u8]) -> Result<()> {
        let page_id = self.page_id(page_index)?;

        let contents = self
            .inner
            .get_object(page_id)?
            .as_dict()?
            .get(b"Contents")
            .ok()
            .cloned();

        let mut streams = match contents {
            None | Some(Object::Null) => Vec::new(),
            Some(Object::Array(items)) => items,
            Some(Object::Reference(id)) => match self.inner.get_object(id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(id)],
            },
            Some(Object::Stream(stream)) => vec![Object::Reference(self.inner.add_object(stream))],
            Some(_) => {
                return Err(PdfError::ParseError(
                    "Page Contents is not a stream".to_string(),
                ))
            }
        };

        let mut appended = Vec::new();
        if !streams.is_empty() {
            let save_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            streams.insert(0, Object::Reference(save_id));
            appended.extend_from_slice(b"\nQ\n");
        }
        appended.extend_from_slice(content);

        let stream_id = self.inner.add_object(Stream::new(Dictionary::new(), appended));
        streams.push(Object::Reference(stream_id));

        let page_dict = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        page_dict.set("Contents", Object::Array(streams));

        Ok(())
    }
}

/// Numeric value of an Integer or Real object
pub fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

/// First `{prefix}{n}` (n >= 1) not present in `taken`
fn next_free_name(prefix: &str, taken: &BTreeSet<String>) -> String {
    (1..)
        .map(|n| format!("{prefix}{n}"))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| prefix.to_string())
}
