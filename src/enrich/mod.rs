// src/enrich/mod.rs
//! Per-alert enrichment: severity and speech text from the matched metadata
//! record, then the unconditional rewrites (informed entities, description,
//! header emoji, stop numbers).
//!
//! A missing field only skips the rule that needs it.

pub mod emoji;
pub mod informed;
pub mod severity;
pub mod text;

use crate::feed::{Alert, Cause, Effect, SeverityLevel, TranslatedString};
use crate::metadata::MetadataRecord;

use self::emoji::AlertFacts;
use self::informed::InformedEntities;

/// What happened to one alert; aggregated into run-level counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertReport {
    pub severity: Option<SeverityLevel>,
    pub speech_text: bool,
    pub rail: bool,
    pub header_rule: Option<&'static str>,
    pub stops_reinterpreted: bool,
}

/// Apply the record-driven rules. Call only when a record matched.
pub fn apply_record(alert: &mut Alert, record: &MetadataRecord, report: &mut AlertReport) {
    if let Some(level) = record
        .priority
        .as_deref()
        .and_then(severity::severity_for_priority)
    {
        alert.severity_level = Some(level as i32);
        report.severity = Some(level);
    }

    if let Some(tts) = record
        .properties
        .speech_text
        .as_deref()
        .and_then(text::speech_text)
    {
        alert.tts_description_text = Some(TranslatedString::english(tts));
        report.speech_text = true;
    }
}

/// Apply the rules that run for every alert, matched or not.
pub fn apply_unconditional(alert: &mut Alert, report: &mut AlertReport) {
    let mut entities = InformedEntities::collect(&alert.informed_entity);
    let rail = entities.is_rail();
    report.rail = rail;

    let desc_txt = alert
        .description_text
        .as_mut()
        .and_then(text::clean_description);

    if let Some(header) = alert.header_text.as_mut() {
        let facts = AlertFacts {
            cause: alert.cause.and_then(|c| Cause::try_from(c).ok()),
            effect: alert.effect.and_then(|e| Effect::try_from(e).ok()),
            rail,
            header: "",
            description: desc_txt.as_deref(),
        };
        report.header_rule = emoji::annotate_header(header, &facts).map(|r| r.name);
    }

    report.stops_reinterpreted = informed::reinterpret_stops(&mut entities, desc_txt.as_deref());
    alert.informed_entity = entities.into_selectors();
}

/// Enrich one alert in place.
pub fn enrich_alert(alert: &mut Alert, record: Option<&MetadataRecord>) -> AlertReport {
    let mut report = AlertReport::default();
    if let Some(rec) = record {
        apply_record(alert, rec, &mut report);
    }
    apply_unconditional(alert, &mut report);
    report
}
