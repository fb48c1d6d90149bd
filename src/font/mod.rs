//! # Font Metrics
//!
//! Measurement services for the line composer: advance widths and vertical
//! metrics as a pure function of (font, text, size).
//!
//! The standard PDF faces (Helvetica, Times, Courier) use built-in metric
//! tables. Fonts registered with the document are parsed with ttf-parser.

pub mod metrics;

use std::collections::HashMap;

use base64::Engine as _;
use log::debug;

pub use metrics::StandardFontMetrics;

use crate::error::LayoutError;
use crate::model::FontEntry;

static HELVETICA_FALLBACK: FontData = FontData::Standard(StandardFont::Helvetica);

/// A font registry that maps font family + weight + style to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
    pub italic: bool,
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts.
    Standard(StandardFont),
    /// A TrueType/OpenType font registered by the document.
    Custom(CustomFontMetrics),
}

/// Horizontal advances and vertical extents of a registered font, in font
/// units.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    /// Advance for characters the font doesn't map.
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
}

impl CustomFontMetrics {
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let units = self
            .advance_widths
            .get(&ch)
            .map_or(self.default_advance, |w| *w);
        units as f64 * font_size / self.units_per_em.max(1) as f64
    }

    /// Read advances for every code point in the font's Unicode cmap
    /// subtables.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables.into_iter().filter(|s| s.is_unicode()) {
                subtable.codepoints(|code| {
                    let Some(ch) = char::from_u32(code) else {
                        return;
                    };
                    if advance_widths.contains_key(&ch) {
                        return;
                    }
                    if let Some(glyph) = subtable.glyph_index(code) {
                        advance_widths.insert(ch, face.glyph_hor_advance(glyph).unwrap_or(0));
                    }
                });
            }
        }

        let default_advance = advance_widths
            .get(&' ')
            .copied()
            .filter(|w| *w > 0)
            .unwrap_or(units_per_em / 2);

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
        })
    }
}

/// The standard faces with built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PostScript name of this face.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Obliques share the upright widths. Times italics reuse the roman
    /// tables.
    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => &metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &metrics::HELVETICA_BOLD,
            Self::TimesRoman | Self::TimesItalic => &metrics::TIMES_ROMAN,
            Self::TimesBold | Self::TimesBoldItalic => &metrics::TIMES_BOLD,
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique => {
                &metrics::COURIER
            }
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        let standard_mappings = [
            (("Helvetica", 400, false), StandardFont::Helvetica),
            (("Helvetica", 700, false), StandardFont::HelveticaBold),
            (("Helvetica", 400, true), StandardFont::HelveticaOblique),
            (("Helvetica", 700, true), StandardFont::HelveticaBoldOblique),
            (("Times", 400, false), StandardFont::TimesRoman),
            (("Times", 700, false), StandardFont::TimesBold),
            (("Times", 400, true), StandardFont::TimesItalic),
            (("Times", 700, true), StandardFont::TimesBoldItalic),
            (("Courier", 400, false), StandardFont::Courier),
            (("Courier", 700, false), StandardFont::CourierBold),
            (("Courier", 400, true), StandardFont::CourierOblique),
            (("Courier", 700, true), StandardFont::CourierBoldOblique),
        ];

        for ((family, weight, italic), font) in standard_mappings {
            fonts.insert(
                FontKey {
                    family: family.to_string(),
                    weight,
                    italic,
                },
                FontData::Standard(font),
            );
        }

        Self { fonts }
    }

    /// Look up a font: exact key, then weight snapped to 400/700, then
    /// Helvetica of the same weight and slant.
    pub fn resolve(&self, family: &str, weight: u32, italic: bool) -> &FontData {
        let snapped_weight = if weight >= 600 { 700 } else { 400 };
        for (family, weight) in [
            (family, weight),
            (family, snapped_weight),
            ("Helvetica", snapped_weight),
        ] {
            let key = FontKey {
                family: family.to_string(),
                weight,
                italic,
            };
            if let Some(font) = self.fonts.get(&key) {
                return font;
            }
        }
        &HELVETICA_FALLBACK
    }

    /// Register a custom font from raw TrueType/OpenType bytes.
    pub fn register(
        &mut self,
        family: &str,
        weight: u32,
        italic: bool,
        data: &[u8],
    ) -> Result<(), LayoutError> {
        let metrics = CustomFontMetrics::from_font_data(data)
            .map_err(|e| LayoutError::Font(format!("'{family}' is not a usable font: {e}")))?;
        debug!(
            "registered font '{}' weight {} italic {} ({} glyph widths)",
            family,
            weight,
            italic,
            metrics.advance_widths.len()
        );
        self.fonts.insert(
            FontKey {
                family: family.to_string(),
                weight,
                italic,
            },
            FontData::Custom(metrics),
        );
        Ok(())
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.fonts.keys().any(|k| k.family == family)
    }
}

/// Shared font context used by layout. Provides text measurement with real
/// glyph metrics.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Decode and register a document font entry. Accepts plain base64 or a
    /// `data:` URI.
    pub fn register_entry(&mut self, entry: &FontEntry) -> Result<(), LayoutError> {
        let payload = match entry.src.split_once("base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => entry.src.as_str(),
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LayoutError::Font(format!("'{}' has invalid base64 data: {e}", entry.family)))?;
        self.registry
            .register(&entry.family, entry.weight, entry.italic, &bytes)
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, family: &str, weight: u32, italic: bool, font_size: f64) -> f64 {
        match self.registry.resolve(family, weight, italic) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom(m) => m.char_width(ch, font_size),
        }
    }

    /// Measure the width of a string in points.
    pub fn measure_string(
        &self,
        text: &str,
        family: &str,
        weight: u32,
        italic: bool,
        font_size: f64,
        letter_spacing: f64,
    ) -> f64 {
        match self.registry.resolve(family, weight, italic) {
            FontData::Standard(std_font) => {
                std_font
                    .metrics()
                    .measure_string(text, font_size, letter_spacing)
            }
            FontData::Custom(m) => text
                .chars()
                .map(|ch| m.char_width(ch, font_size) + letter_spacing)
                .sum(),
        }
    }

    /// Ascent and descent in points, both positive.
    pub fn vertical_metrics(&self, family: &str, weight: u32, italic: bool, font_size: f64) -> (f64, f64) {
        match self.registry.resolve(family, weight, italic) {
            FontData::Standard(std_font) => {
                let m = std_font.metrics();
                (
                    m.ascender as f64 * font_size / 1000.0,
                    -(m.descender as f64) * font_size / 1000.0,
                )
            }
            FontData::Custom(m) => {
                let upem = m.units_per_em.max(1) as f64;
                (
                    m.ascender as f64 * font_size / upem,
                    -(m.descender as f64) * font_size / upem,
                )
            }
        }
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}
