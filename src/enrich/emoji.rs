// src/enrich/emoji.rs
//! Header emoji annotation: an ordered rule table, first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::feed::{Cause, Effect, TranslatedString};

use super::text::is_english;

/// What a rule looks at.
#[derive(Debug, Clone, Copy)]
pub enum When {
    /// Regex over header text + cleaned description.
    Text(&'static str),
    /// Cause/effect codes; `effects` empty means any effect, `rail` `None` means either.
    Codes {
        cause: Option<Cause>,
        effects: &'static [Effect],
        rail: Option<bool>,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct HeaderRule {
    pub name: &'static str,
    pub when: When,
    pub prefix: &'static str,
}

pub const HEADER_RULES: &[HeaderRule] = &[
    HeaderRule {
        name: "lift_unavailable",
        when: When::Text(r"(?i)lift at .*(not available|out of service)"),
        prefix: "⛔️🛗 ",
    },
    HeaderRule {
        name: "bus_stop_closure",
        when: When::Text(r"(?i)bus stop closures?"),
        prefix: "⛔️🚏 ",
    },
    HeaderRule {
        name: "trackwork_text",
        when: When::Text(r"(?i)trackwork may affect your travel"),
        prefix: "🛠🛤 ",
    },
    HeaderRule {
        name: "rail_maintenance",
        when: When::Codes {
            cause: Some(Cause::Maintenance),
            effects: &[Effect::ModifiedService],
            rail: Some(true),
        },
        prefix: "🛠🛤 ",
    },
    HeaderRule {
        name: "maintenance",
        when: When::Codes {
            cause: Some(Cause::Maintenance),
            effects: &[Effect::ModifiedService],
            rail: Some(false),
        },
        prefix: "🛠 ",
    },
    HeaderRule {
        name: "weather",
        when: When::Codes {
            cause: Some(Cause::Weather),
            effects: &[],
            rail: None,
        },
        prefix: "🌨 ",
    },
    HeaderRule {
        name: "modified_or_detour",
        when: When::Codes {
            cause: None,
            effects: &[Effect::ModifiedService, Effect::Detour],
            rail: None,
        },
        prefix: "🔀 ",
    },
];

// One compiled regex per table entry (None for code rules), same indices as HEADER_RULES.
static COMPILED: Lazy<Vec<Option<Regex>>> = Lazy::new(|| {
    HEADER_RULES
        .iter()
        .map(|r| match r.when {
            When::Text(p) => Some(Regex::new(p).expect("header rule regex")),
            When::Codes { .. } => None,
        })
        .collect()
});

/// Facts about one alert the rules are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct AlertFacts<'a> {
    pub cause: Option<Cause>,
    pub effect: Option<Effect>,
    pub rail: bool,
    pub header: &'a str,
    pub description: Option<&'a str>,
}

impl AlertFacts<'_> {
    fn haystack(&self) -> String {
        match self.description {
            Some(d) => format!("{} {}", self.header, d),
            None => self.header.to_string(),
        }
    }
}

fn codes_match(when: &When, facts: &AlertFacts<'_>) -> bool {
    let When::Codes {
        cause,
        effects,
        rail,
    } = when
    else {
        return false;
    };
    if cause.is_some() && *cause != facts.cause {
        return false;
    }
    if !effects.is_empty() && !facts.effect.is_some_and(|e| effects.contains(&e)) {
        return false;
    }
    rail.map_or(true, |r| r == facts.rail)
}

/// First rule matching the facts.
pub fn select_rule(facts: &AlertFacts<'_>) -> Option<&'static HeaderRule> {
    let haystack = facts.haystack();
    HEADER_RULES
        .iter()
        .zip(COMPILED.iter())
        .find(|(rule, re)| match re {
            Some(re) => re.is_match(&haystack),
            None => codes_match(&rule.when, facts),
        })
        .map(|(rule, _)| rule)
}

fn already_prefixed(text: &str) -> bool {
    HEADER_RULES
        .iter()
        .any(|r| text.starts_with(r.prefix.trim_end()))
}

/// Trim the English header and prefix it with the first matching rule's emoji.
///
/// Returns the applied rule. A header that already carries one of the table's
/// prefixes is only trimmed, so repeated runs never stack emoji.
pub fn annotate_header(
    header: &mut TranslatedString,
    facts: &AlertFacts<'_>,
) -> Option<&'static HeaderRule> {
    let t = header
        .translation
        .iter_mut()
        .find(|t| is_english(t.language.as_deref()))?;

    let trimmed = t.text.trim().to_string();
    if trimmed.is_empty() || already_prefixed(&trimmed) {
        t.text = trimmed;
        return None;
    }

    let facts = AlertFacts {
        header: &trimmed,
        ..facts.clone()
    };
    let rule = select_rule(&facts);
    t.text = match rule {
        Some(r) => format!("{}{}", r.prefix, trimmed),
        None => trimmed,
    };
    rule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Translation;

    fn facts<'a>(
        header: &'a str,
        cause: Option<Cause>,
        effect: Option<Effect>,
        rail: bool,
    ) -> AlertFacts<'a> {
        AlertFacts {
            cause,
            effect,
            rail,
            header,
            description: None,
        }
    }

    fn header(text: &str) -> TranslatedString {
        TranslatedString {
            translation: vec![Translation::new(text, Some("en"))],
        }
    }

    #[test]
    fn lift_rule_beats_rail_maintenance() {
        let mut h = header("  Lift at Central not available ");
        let f = facts("", Some(Cause::Maintenance), Some(Effect::ModifiedService), true);
        let rule = annotate_header(&mut h, &f).unwrap();
        assert_eq!(rule.name, "lift_unavailable");
        assert_eq!(h.translation[0].text, "⛔️🛗 Lift at Central not available");
    }

    #[test]
    fn lift_beats_trackwork_text() {
        let f = AlertFacts {
            description: Some("Trackwork may affect your travel"),
            ..facts("Lift at Town Hall out of service", None, None, false)
        };
        assert_eq!(select_rule(&f).unwrap().name, "lift_unavailable");
    }

    #[test]
    fn trackwork_text_in_header_or_description() {
        let in_header = facts("Trackwork may affect your travel this weekend", None, None, false);
        assert_eq!(select_rule(&in_header).unwrap().name, "trackwork_text");

        let in_description = AlertFacts {
            description: Some("Trackwork may affect your travel"),
            ..facts("Weekend changes", None, None, false)
        };
        let rule = select_rule(&in_description).unwrap();
        assert_eq!(rule.name, "trackwork_text");
        assert_eq!(rule.prefix, "🛠🛤 ");
    }

    #[test]
    fn trackwork_text_outranks_maintenance_codes() {
        let m = Some(Cause::Maintenance);
        let ms = Some(Effect::ModifiedService);

        let mut h = header("Trackwork may affect your travel");
        let rule = annotate_header(&mut h, &facts("", m, ms, false)).unwrap();
        assert_eq!(rule.name, "trackwork_text");
        assert_eq!(h.translation[0].text, "🛠🛤 Trackwork may affect your travel");

        let rail = facts("Trackwork may affect your travel", m, ms, true);
        assert_eq!(select_rule(&rail).unwrap().name, "trackwork_text");
    }

    #[test]
    fn blank_header_is_not_annotated() {
        let mut h = header("   ");
        let f = facts("", None, Some(Effect::Detour), false);
        assert!(annotate_header(&mut h, &f).is_none());
        assert_eq!(h.translation[0].text, "");
    }

    #[test]
    fn description_text_participates_in_matching() {
        let f = AlertFacts {
            description: Some("Bus stop closure on George St"),
            ..facts("Changed stops", None, None, false)
        };
        assert_eq!(select_rule(&f).unwrap().prefix, "⛔️🚏 ");
    }

    #[test]
    fn code_rules_in_priority_order() {
        let m = Some(Cause::Maintenance);
        let ms = Some(Effect::ModifiedService);
        assert_eq!(select_rule(&facts("x", m, ms, true)).unwrap().prefix, "🛠🛤 ");
        assert_eq!(select_rule(&facts("x", m, ms, false)).unwrap().prefix, "🛠 ");
        assert_eq!(
            select_rule(&facts("x", Some(Cause::Weather), Some(Effect::Detour), false))
                .unwrap()
                .prefix,
            "🌨 "
        );
        assert_eq!(
            select_rule(&facts("x", Some(Cause::Accident), Some(Effect::Detour), false))
                .unwrap()
                .prefix,
            "🔀 "
        );
        assert_eq!(
            select_rule(&facts("x", m, Some(Effect::Detour), true)).unwrap().prefix,
            "🔀 "
        );
        assert!(select_rule(&facts("x", m, Some(Effect::NoService), false)).is_none());
        assert!(select_rule(&facts("x", None, None, false)).is_none());
    }

    #[test]
    fn annotation_never_stacks() {
        let mut h = header("Detour via Oxford St");
        let f = facts("", None, Some(Effect::Detour), false);
        annotate_header(&mut h, &f);
        annotate_header(&mut h, &f);
        assert_eq!(h.translation[0].text, "🔀 Detour via Oxford St");
    }

    #[test]
    fn no_english_translation_is_left_alone() {
        let mut h = TranslatedString {
            translation: vec![Translation::new(" 绕行 ", Some("zh"))],
        };
        let f = facts("", None, Some(Effect::Detour), false);
        assert!(annotate_header(&mut h, &f).is_none());
        assert_eq!(h.translation[0].text, " 绕行 ");
    }

    #[test]
    fn unmatched_header_is_still_trimmed() {
        let mut h = header("  Plain notice  ");
        assert!(annotate_header(&mut h, &facts("", None, None, false)).is_none());
        assert_eq!(h.translation[0].text, "Plain notice");
    }
}
