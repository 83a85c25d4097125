//! Image handling for PDF documents

use crate::text::format_number;
use crate::{PdfError, Result};
use image::{DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Object, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// How an image fills its target box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageScaleMode {
    /// Fill the box exactly
    #[default]
    Stretch,
    /// Largest size inside the box with the source aspect ratio
    Contain,
}

/// Display size in points of an `original_width` x `original_height` pixel
/// image drawn into a `target_width` x `target_height` box
pub fn calculate_scaled_dimensions(
    original_width: u32,
    original_height: u32,
    target_width: f64,
    target_height: f64,
    mode: ImageScaleMode,
) -> (f64, f64) {
    if original_width == 0 || original_height == 0 {
        return (target_width, target_height);
    }
    match mode {
        ImageScaleMode::Stretch => (target_width, target_height),
        ImageScaleMode::Contain => {
            let scale = (target_width / original_width as f64)
                .min(target_height / original_height as f64);
            (original_width as f64 * scale, original_height as f64 * scale)
        }
    }
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Sniff the image format (signatures are PNG or JPEG)
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    match data {
        d if d.len() < 8 => Err(PdfError::ImageError("Image data too short".to_string())),
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),
        d if d.starts_with(&PNG_SIGNATURE) => Ok(ImageFormat::Png),
        _ => Err(PdfError::ImageError(
            "Unsupported image format, expected PNG or JPEG".to_string(),
        )),
    }
}

/// JPEG info including dimensions and color components
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray", "DeviceCMYK")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// PDF filter ("DCTDecode" for JPEG, "FlateDecode" for PNG)
    pub filter: String,
    /// Encoded image data
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, when the source had one
    pub soft_mask: Option<Vec<u8>>,
}

/// Find the SOF segment of a JPEG
///
/// SOF layout: marker (2) length (2) precision (1) height (2) width (2) components (1)
fn get_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15 except DHT, JPG and DAC
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError(
        "Could not parse JPEG info".to_string(),
    ))
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

impl ImageXObject {
    /// Create an XObject from JPEG or PNG bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// Create XObject from JPEG data
    ///
    /// JPEG images are embedded as-is with DCTDecode.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = get_jpeg_info(data)?;

        let color_space = match info.num_components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: data.to_vec(),
            soft_mask: None,
        })
    }

    /// Create XObject from PNG data
    ///
    /// Color channels are re-encoded with FlateDecode. An alpha channel
    /// becomes a separate soft mask so transparent pixels stay transparent
    /// over the template.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let decoder = reader.into_decoder()?;

        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        let image = DynamicImage::from_decoder(decoder)?;

        let (raw_data, color_space, alpha) = match color_type {
            image::ColorType::L8 | image::ColorType::L16 => {
                (image.to_luma8().into_raw(), "DeviceGray", None)
            }
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = image.to_luma_alpha8();
                let gray = la.pixels().map(|p| p[0]).collect::<Vec<u8>>();
                let alpha = la.pixels().map(|p| p[1]).collect::<Vec<u8>>();
                (gray, "DeviceGray", Some(alpha))
            }
            image::ColorType::Rgba8 | image::ColorType::Rgba16 | image::ColorType::Rgba32F => {
                let rgba = image.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel[3]);
                }
                (rgb, "DeviceRGB", Some(alpha))
            }
            _ => (image.to_rgb8().into_raw(), "DeviceRGB", None),
        };

        // fully opaque masks are dropped
        let alpha = alpha.filter(|a| a.iter().any(|&v| v != 0xFF));

        Ok(Self {
            width,
            height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&raw_data)?,
            soft_mask: alpha.as_deref().map(deflate).transpose()?,
        })
    }

    /// Soft mask XObject stream, if the image carries alpha
    pub fn soft_mask_stream(&self) -> Option<Stream> {
        self.soft_mask.as_ref().map(|mask| {
            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"XObject".to_vec()));
            dict.set("Subtype", Object::Name(b"Image".to_vec()));
            dict.set("Width", self.width as i64);
            dict.set("Height", self.height as i64);
            dict.set("ColorSpace", Object::Name(b"DeviceGray".to_vec()));
            dict.set("BitsPerComponent", 8);
            dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            Stream::new(dict, mask.clone())
        })
    }

    /// Convert to lopdf Stream object
    ///
    /// `soft_mask` is the object id of the stream from `soft_mask_stream`.
    pub fn to_pdf_stream(&self, soft_mask: Option<lopdf::ObjectId>) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        if let Some(id) = soft_mask {
            dict.set("SMask", Object::Reference(id));
        }

        Stream::new(dict, self.data.clone())
    }
}

/// Generate operators to draw an image with its lower-left corner at (x, y)
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{image_name} Do\nQ\n",
        format_number(width),
        format_number(height),
        format_number(x),
        format_number(y)
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgba};

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_detect_format() {
        let jfif = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F'];
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&jfif).unwrap(), ImageFormat::Jpeg);
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(detect_format(&[0u8; 8]).is_err());
        assert!(detect_format(&[0xFF, 0xD8, 0xFF]).is_err());
    }

    #[test]
    fn test_jpeg_info() {
        let jpeg = vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, // SOF0
            0x00, 0x11, // Length
            0x08, // Precision
            0x00, 0x64, // Height (100)
            0x00, 0xC8, // Width (200)
            0x01, // Components
            0x01, 0x22, 0x00, 0xFF, 0xD9,
        ];

        let xobject = ImageXObject::from_bytes(&jpeg).unwrap();
        assert_eq!(xobject.width, 200);
        assert_eq!(xobject.height, 100);
        assert_eq!(xobject.color_space, "DeviceGray");
        assert_eq!(xobject.filter, "DCTDecode");
        assert!(xobject.soft_mask.is_none());
    }

    #[test]
    fn test_jpeg_info_invalid() {
        let data = vec![0xFF, 0xD8, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(get_jpeg_info(&data).is_err());
    }

    #[test]
    fn test_png_opaque_has_no_soft_mask() {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 2, Luma([10]));
        let xobject = ImageXObject::from_png(&encode_png(img.into())).unwrap();

        assert_eq!((xobject.width, xobject.height), (4, 2));
        assert_eq!(xobject.color_space, "DeviceGray");
        assert!(xobject.soft_mask.is_none());
        assert!(xobject.soft_mask_stream().is_none());
    }

    #[test]
    fn test_png_with_alpha_keeps_soft_mask() {
        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(3, 3, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([0, 0, 255, 255]));

        let xobject = ImageXObject::from_png(&encode_png(img.into())).unwrap();
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "FlateDecode");

        let mask = xobject.soft_mask_stream().expect("soft mask");
        assert_eq!(
            mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray"
        );
        let inflated = mask.decompressed_content().unwrap();
        assert_eq!(inflated.len(), 9);
        assert_eq!(inflated[4], 255);
        assert_eq!(inflated[0], 0);
    }

    #[test]
    fn test_image_xobject_to_pdf_stream() {
        let xobject = ImageXObject {
            width: 100,
            height: 50,
            color_space: "DeviceRGB".to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: vec![1, 2, 3, 4, 5],
            soft_mask: None,
        };

        let stream = xobject.to_pdf_stream(Some((7, 0)));
        let dict = &stream.dict;

        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(dict.get(b"Width").unwrap().as_i64().unwrap(), 100);
        assert_eq!(dict.get(b"Height").unwrap().as_i64().unwrap(), 50);
        assert_eq!(dict.get(b"SMask").unwrap().as_reference().unwrap(), (7, 0));
        assert_eq!(stream.content, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_generate_image_operators() {
        let ops = generate_image_operators("Im1", 300.0, 120.0, 120.0, 40.0);
        let ops_str = String::from_utf8(ops).unwrap();

        assert_eq!(ops_str, "q\n120 0 0 40 300 120 cm\n/Im1 Do\nQ\n");
    }

    #[test]
    fn test_calculate_scaled_dimensions_stretch() {
        let (w, h) = calculate_scaled_dimensions(800, 600, 120.0, 40.0, ImageScaleMode::Stretch);
        assert_eq!((w, h), (120.0, 40.0));
    }

    #[test]
    fn test_calculate_scaled_dimensions_contain() {
        // 600x100 signature in 120x40 box: width limited, scale 0.2
        let (w, h) = calculate_scaled_dimensions(600, 100, 120.0, 40.0, ImageScaleMode::Contain);
        assert_eq!((w, h), (120.0, 20.0));

        // 200x200 in 120x40 box: height limited
        let (w, h) = calculate_scaled_dimensions(200, 200, 120.0, 40.0, ImageScaleMode::Contain);
        assert_eq!((w, h), (40.0, 40.0));
    }

    #[test]
    fn test_calculate_scaled_dimensions_degenerate_source() {
        let (w, h) = calculate_scaled_dimensions(0, 0, 120.0, 40.0, ImageScaleMode::Contain);
        assert_eq!((w, h), (120.0, 40.0));
    }
}
