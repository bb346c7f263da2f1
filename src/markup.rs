//! Markup string helpers shared by the renderer and the element serializer

use crate::config::QuoteStyle;
use crate::model::Attributes;

/// Escape text content so it reads back as the same characters
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value for the given quote character
pub fn escape_attribute(value: &str, quote: QuoteStyle) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' if quote == QuoteStyle::Double => out.push_str("&quot;"),
            '\'' if quote == QuoteStyle::Single => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Append `<tag a='v'>` (or `<tag a='v'/>` when `self_closing`)
pub fn push_open_tag(
    out: &mut String,
    tag: &str,
    attributes: &Attributes,
    quote: QuoteStyle,
    self_closing: bool,
) {
    let q = quote.as_char();
    out.push('<');
    out.push_str(tag);
    for (key, value) in attributes.iter() {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        out.push(q);
        out.push_str(&escape_attribute(value, quote));
        out.push(q);
    }
    out.push_str(if self_closing { "/>" } else { ">" });
}

pub fn push_close_tag(out: &mut String, tag: &str) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}
