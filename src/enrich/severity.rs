// src/enrich/severity.rs
//! Closed mapping from the secondary feed's priority hint to a GTFS severity.

use crate::feed::SeverityLevel;

/// Priorities not listed here leave the alert's severity untouched.
pub const PRIORITY_SEVERITY: &[(&str, SeverityLevel)] = &[
    ("low", SeverityLevel::Info),
    ("normal", SeverityLevel::Warning),
];

pub fn severity_for_priority(priority: &str) -> Option<SeverityLevel> {
    PRIORITY_SEVERITY
        .iter()
        .find(|(p, _)| *p == priority)
        .map(|(_, s)| *s)
}
