//! Rich message body to plain text
//!
//! Conversion is delegated to htmd. The only custom handling is for emoji,
//! which the client renders as `<img>` elements carrying the shortcode.

use htmd::{
    Element, HtmlToMarkdown,
    element_handler::{HandlerResult, Handlers},
};
use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Invalid blank line regex"));

/// Converts the HTML of one message body to plain text
pub trait TextFormatter {
    fn to_plain_text(&self, html: &str) -> anyhow::Result<String>;
}

/// htmd-backed formatter
pub struct HtmdFormatter {
    converter: HtmlToMarkdown,
}

impl HtmdFormatter {
    #[must_use]
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "button", "svg"])
            .add_handler(vec!["img"], emoji_handler)
            .build();
        Self { converter }
    }
}

impl Default for HtmdFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter for HtmdFormatter {
    fn to_plain_text(&self, html: &str) -> anyhow::Result<String> {
        let text = self.converter.convert(html)?;
        Ok(EXCESS_BLANK_LINES
            .replace_all(text.trim(), "\n\n")
            .into_owned())
    }
}

/// Emoji images become their `:shortcode:`, other images their alt text
fn emoji_handler(_handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let text = get_attr(element.attrs, "data-stringify-emoji")
        .or_else(|| get_attr(element.attrs, "data-stringify-text"))
        .or_else(|| get_attr(element.attrs, "alt"))
        .unwrap_or_default();
    Some(HandlerResult::from(text))
}

fn get_attr(attrs: &[html5ever::Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
        .filter(|v| !v.trim().is_empty())
}
