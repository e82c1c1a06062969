// src/enrich/text.rs
//! HTML flattening and description cleanup.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::feed::{TranslatedString, Translation};

pub const BULLET: &str = "• ";

fn re_list_item() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)<li\b[^>]*>").expect("list item regex"))
}

fn re_line_break() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break regex"))
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?s)</?[A-Za-z!][^>]*>").expect("tag regex"))
}

fn re_block_markup() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)</?\s*(p|div|ul|ol|li|br)\b[^>]*>").expect("block markup regex")
    })
}

/// Flatten an HTML fragment to plain text.
///
/// List items get a bullet prefix, `<br>` becomes a newline, every other tag
/// is dropped without adding whitespace. Entities are decoded after tag
/// removal; decoded block markup is escaped again so flattened text is never
/// mistaken for HTML on a later pass.
pub fn html_to_text(html: &str) -> String {
    let out = re_list_item().replace_all(html, BULLET);
    let out = re_line_break().replace_all(&out, "\n");
    let out = re_tags().replace_all(&out, "");
    let decoded = html_escape::decode_html_entities(&out);
    let out = re_block_markup().replace_all(&decoded, |c: &regex::Captures<'_>| {
        html_escape::encode_text(&c[0]).into_owned()
    });
    out.trim().to_string()
}

/// Language tags like `en`, `en-AU`, `en/html`; an untagged translation counts as English.
pub fn is_english(language: Option<&str>) -> bool {
    let Some(lang) = language else {
        return true;
    };
    let primary = lang.split(['/', '-', '_']).next().unwrap_or_default();
    primary.eq_ignore_ascii_case("en")
}

pub fn is_html_translation(t: &Translation) -> bool {
    let tagged = t
        .language
        .as_deref()
        .is_some_and(|l| l.to_ascii_lowercase().contains("html"));
    tagged || re_block_markup().is_match(&t.text)
}

/// Preferred English text of a translated string: first English translation,
/// else the first translation of any language.
pub fn english_text(ts: &TranslatedString) -> Option<&str> {
    ts.translation
        .iter()
        .find(|t| is_english(t.language.as_deref()))
        .or_else(|| ts.translation.first())
        .map(|t| t.text.as_str())
}

/// Clean a description in place and return its primary English text.
///
/// When an HTML-flavoured translation exists it is flattened and becomes the
/// only translation (language `en`); the HTML original is not retained.
/// Otherwise every translation is trimmed.
pub fn clean_description(desc: &mut TranslatedString) -> Option<String> {
    if let Some(html) = desc.translation.iter().find(|t| is_html_translation(t)) {
        let text = html_to_text(&html.text);
        desc.translation = vec![Translation::new(text.clone(), Some("en"))];
        return Some(text);
    }

    for t in desc.translation.iter_mut() {
        let trimmed = t.text.trim();
        if trimmed.len() != t.text.len() {
            t.text = trimmed.to_string();
        }
    }
    english_text(desc).map(str::to_string)
}

/// Plain text for speech synthesis, or `None` when nothing is left after flattening.
pub fn speech_text(raw: &str) -> Option<String> {
    let text = html_to_text(raw);
    (!text.is_empty()).then_some(text)
}
