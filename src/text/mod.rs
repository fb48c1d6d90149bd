//! # Text Segmentation
//!
//! Splits text into the atoms the line composer packs: words with their
//! trailing whitespace, at UAX#14 break opportunities. Mandatory breaks
//! (newlines) are carried on the word that precedes them.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::style::TextTransform;

/// One unbreakable piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// The visible part, without trailing whitespace or newline.
    pub word: String,
    /// Trailing whitespace after the word (newlines removed).
    pub trailing: String,
    /// A line must end after this segment.
    pub mandatory: bool,
}

fn is_newline(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split `text` at break opportunities.
///
/// The end of the text is never reported as mandatory unless the text
/// actually ends with a newline.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut result = Vec::new();
    let mut start = 0;
    for (offset, opportunity) in linebreaks(text) {
        let piece = &text[start..offset];
        start = offset;
        let ends_with_newline = piece.chars().last().is_some_and(is_newline);
        let mandatory = matches!(opportunity, BreakOpportunity::Mandatory) && ends_with_newline;
        let body = piece.trim_end_matches(is_newline);
        let word = body.trim_end();
        result.push(Segment {
            word: word.to_string(),
            trailing: body[word.len()..].to_string(),
            mandatory,
        });
    }
    result
}

/// Apply a text transform before measurement.
pub fn apply_text_transform(text: &str, transform: TextTransform) -> String {
    match transform {
        TextTransform::None => text.to_string(),
        TextTransform::Uppercase => text.to_uppercase(),
        TextTransform::Lowercase => text.to_lowercase(),
        TextTransform::Capitalize => {
            let mut result = String::with_capacity(text.len());
            let mut prev_is_whitespace = true;
            for ch in text.chars() {
                if prev_is_whitespace && ch.is_alphabetic() {
                    result.extend(ch.to_uppercase());
                } else {
                    result.push(ch);
                }
                prev_is_whitespace = ch.is_whitespace();
            }
            result
        }
    }
}

/// Break a word that is wider than `max_width` into pieces that fit, at
/// character boundaries. Every piece holds at least one character.
pub fn split_word(word: &str, max_width: f64, char_width: impl Fn(char) -> f64) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;
    for ch in word.chars() {
        let w = char_width(ch);
        if !current.is_empty() && width + w > max_width {
            pieces.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(ch);
        width += w;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
