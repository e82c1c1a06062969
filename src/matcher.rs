// src/matcher.rs
//! Joins primary-feed alerts to secondary-feed records via the key embedded in
//! the alert URL (`...#/<id>`).

use crate::feed::Alert;
use crate::metadata::{MetadataIndex, MetadataRecord};

const KEY_SEPARATOR: &str = "#/";

/// Everything after the last `#/`, or the whole string when there is none.
pub fn join_key(url: &str) -> &str {
    match url.rfind(KEY_SEPARATOR) {
        Some(pos) => &url[pos + KEY_SEPARATOR.len()..],
        None => url,
    }
}

/// Join key of an alert, if it carries a URL with at least one translation.
pub fn alert_join_key(alert: &Alert) -> Option<&str> {
    alert
        .url
        .as_ref()
        .and_then(|u| u.translation.first())
        .map(|t| join_key(&t.text))
}

#[derive(Debug, PartialEq)]
pub enum MatchOutcome<'a> {
    Matched(&'a MetadataRecord),
    /// Key extracted but no record carries it.
    Miss(String),
    /// No URL translation to extract a key from.
    NoUrl,
}

pub fn match_alert<'a>(alert: &Alert, index: &'a MetadataIndex) -> MatchOutcome<'a> {
    let Some(key) = alert_join_key(alert) else {
        return MatchOutcome::NoUrl;
    };
    match index.get(key) {
        Some(rec) => MatchOutcome::Matched(rec),
        None => MatchOutcome::Miss(key.to_string()),
    }
}
