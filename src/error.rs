//! Structured error types for the layout engine.
//!
//! Style fallbacks, containing-block fallbacks and overflow policies are
//! recovered locally during layout and never show up here. What remains is
//! input that can't be read and trees that can't produce geometry at all.

use thiserror::Error;

use crate::model::NodeId;

/// The unified error type returned by all public API functions.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// JSON input failed to parse as a valid document.
    #[error("Failed to parse document: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// A registered font could not be decoded or parsed.
    #[error("Font error: {0}")]
    Font(String),

    /// The page leaves no room for content once margins, headers and
    /// footers are taken out.
    #[error("Page content area is {width:.2}x{height:.2}pt; no content can be placed")]
    InvalidPage { width: f64, height: f64 },

    /// A multi-column region was requested with no positive width.
    #[error("Node {node} requests columns {width:.2}pt wide; regions need a positive width")]
    InvalidRegion { node: NodeId, width: f64 },

    /// The flow stack was left in a state the engine can't continue from.
    #[error("Layout flow error: {0}")]
    FlowState(&'static str),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        LayoutError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_a_hint() {
        let err: LayoutError = serde_json::from_str::<crate::model::Document>("{ \"children\": [ }")
            .unwrap_err()
            .into();
        let message = err.to_string();
        assert!(message.starts_with("Failed to parse document"));
        assert!(message.contains("Hint:"));
    }

    #[test]
    fn structural_errors_name_the_node() {
        let err = LayoutError::InvalidRegion {
            node: NodeId(4),
            width: -2.0,
        };
        assert!(err.to_string().contains("#4"));
    }
}
