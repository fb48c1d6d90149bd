//! # Canvas Sizing
//!
//! Canvases are replaced content: the line composer needs their intrinsic
//! size before anything inside them is laid out. Size comes from the node,
//! then from the root `<svg>` element of its markup, then from the engine
//! default (300×150).

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::geometry::Size;

/// A parsed SVG viewBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Parse a viewBox string like "0 0 100 100" or "0,0,100,100".
pub fn parse_view_box(s: &str) -> Option<ViewBox> {
    let parts: Vec<f64> = s
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<f64>().ok())
        .collect();
    match parts.as_slice() {
        [min_x, min_y, width, height] if *width > 0.0 && *height > 0.0 => Some(ViewBox {
            min_x: *min_x,
            min_y: *min_y,
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

/// Attributes of the outermost `<svg>` element that matter for sizing.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarkupSize {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub view_box: Option<ViewBox>,
}

/// Read width, height and viewBox from the first `<svg>` element.
/// Markup without one, or markup that doesn't parse, yields nothing.
pub fn markup_size(content: &str) -> MarkupSize {
    let mut reader = Reader::from_str(content);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() != b"svg" {
                    return MarkupSize::default();
                }
                return MarkupSize {
                    width: get_attr(e, "width").and_then(|v| parse_length(&v)),
                    height: get_attr(e, "height").and_then(|v| parse_length(&v)),
                    view_box: get_attr(e, "viewBox").and_then(|v| parse_view_box(&v)),
                };
            }
            Ok(Event::Eof) => return MarkupSize::default(),
            Err(e) => {
                warn!("canvas markup is not readable ({}); using default size", e);
                return MarkupSize::default();
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Parse a length like "120", "120px" or "120pt". Percentages and other
/// units don't give an intrinsic size.
fn parse_length(value: &str) -> Option<f64> {
    let v = value.trim();
    let number = v
        .strip_suffix("px")
        .or_else(|| v.strip_suffix("pt"))
        .unwrap_or(v);
    number.trim().parse::<f64>().ok().filter(|n| *n > 0.0)
}

fn get_attr(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == name.as_bytes() {
            return String::from_utf8(attr.value.to_vec()).ok();
        }
    }
    None
}

/// Resolve the intrinsic size of a canvas.
///
/// Explicit node sizes win. A missing dimension is taken from the markup;
/// if only one is known and a viewBox is available, the other follows its
/// aspect ratio. Anything still unknown uses `default`.
pub fn intrinsic_size(
    width: Option<f64>,
    height: Option<f64>,
    view_box: Option<&str>,
    content: Option<&str>,
    default: Size,
) -> Size {
    let markup = content.map(markup_size).unwrap_or_default();
    let view_box = view_box.and_then(parse_view_box).or(markup.view_box);

    let width = width.or(markup.width);
    let height = height.or(markup.height);

    match (width, height, view_box) {
        (Some(w), Some(h), _) => Size::new(w, h),
        (Some(w), None, Some(vb)) => Size::new(w, w * vb.height / vb.width),
        (None, Some(h), Some(vb)) => Size::new(h * vb.width / vb.height, h),
        (w, h, _) => Size::new(w.unwrap_or(default.width), h.unwrap_or(default.height)),
    }
}
