//! Text rendering utilities

use crate::document::Color;

/// Context for rendering one run of text
pub struct TextRenderContext {
    /// PDF font resource name (e.g., "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f32,
    /// Text color (RGB)
    pub color: Color,
}

/// Format a coordinate or size for a content stream.
///
/// Values are rounded to three decimals and trailing zeros are dropped, so
/// the same position always produces the same bytes.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let text = format!("{rounded:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// Generate PDF operators for text insertion
///
/// Creates the text operators (BT, rg, Tf, Td, Tj, ET) drawing an already
/// encoded string with its baseline starting at `(x, y)`.
///
/// # Arguments
/// * `text_hex` - Hex-encoded text (e.g., "<48656C6C6F>")
/// * `x` - X coordinate in points (from left)
/// * `y` - Y coordinate in points (from bottom)
/// * `ctx` - Text rendering context
pub fn generate_text_operators(text_hex: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();

    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        format_number(ctx.color.r as f64),
        format_number(ctx.color.g as f64),
        format_number(ctx.color.b as f64)
    ));
    ops.push_str(&format!(
        "/{} {} Tf\n",
        ctx.font_name,
        format_number(ctx.font_size as f64)
    ));
    ops.push_str(&format!("{} {} Td\n", format_number(x), format_number(y)));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");

    ops.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(font_name: &str, font_size: f32) -> TextRenderContext {
        TextRenderContext {
            font_name: font_name.to_string(),
            font_size,
            color: Color::black(),
        }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(289.16), "289.16");
        assert_eq!(format_number(289.159_996_032_714_84), "289.16");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-12.25), "-12.25");
        assert_eq!(format_number(-0.0001), "0");
    }

    #[test]
    fn test_generate_text_operators() {
        let ops = generate_text_operators("<48656C6C6F>", 100.0, 700.0, &ctx("F1", 12.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.starts_with("BT\n"));
        assert!(ops_str.contains("0 0 0 rg"));
        assert!(ops_str.contains("/F1 12 Tf"));
        assert!(ops_str.contains("100 700 Td"));
        assert!(ops_str.contains("<48656C6C6F> Tj"));
        assert!(ops_str.ends_with("ET\n"));
    }

    #[test]
    fn test_generate_text_operators_fractional_position() {
        let ops = generate_text_operators("<2F>", 289.16, 512.5, &ctx("F2", 9.5));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("/F2 9.5 Tf"));
        assert!(ops_str.contains("289.16 512.5 Td"));
    }

    #[test]
    fn test_generate_text_operators_with_color() {
        let ctx = TextRenderContext {
            font_name: "F1".to_string(),
            font_size: 12.0,
            color: Color::rgb(0.0, 0.0, 0.5),
        };

        let ops = generate_text_operators("<41>", 100.0, 700.0, &ctx);
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("0 0 0.5 rg"));
    }

    #[test]
    fn test_generate_text_operators_empty_text() {
        let ops = generate_text_operators("<>", 10.0, 20.0, &ctx("F1", 12.0));
        let ops_str = String::from_utf8(ops).unwrap();

        assert!(ops_str.contains("<> Tj"));
    }
}
