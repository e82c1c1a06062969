// src/enrich/informed.rs
//! Informed-entity rewriting: selector dedup, rail detection, and the
//! stop-number reinterpretation heuristic.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

use crate::feed::EntitySelector;

/// Agency ids that mark an alert as a rail alert.
pub const RAIL_AGENCY_IDS: &[&str] = &["SydneyTrains", "NSWTrains"];

/// Selectors after rewriting, in emission order: trips, stops, routes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InformedEntities {
    pub trips: Vec<EntitySelector>,
    pub stops: Vec<String>,
    pub routes: Vec<(Option<String>, Option<String>)>,
    pub agencies: Vec<String>,
}

impl InformedEntities {
    /// Split and dedup raw selectors.
    ///
    /// Trip selectors are kept one for one. A selector naming a stop adds that
    /// stop; one naming a route or agency adds its `(route_id, agency_id)` pair.
    /// A selector with both a stop and a route contributes to both groups.
    /// Duplicates keep their first position.
    pub fn collect(selectors: &[EntitySelector]) -> Self {
        let mut out = Self::default();
        let mut seen_stops = HashSet::new();
        let mut seen_routes = HashSet::new();
        let mut seen_agencies = HashSet::new();

        for sel in selectors {
            if sel.trip.is_some() {
                out.trips.push(sel.clone());
                continue;
            }
            if let Some(agency) = &sel.agency_id {
                if seen_agencies.insert(agency.clone()) {
                    out.agencies.push(agency.clone());
                }
            }
            if let Some(stop) = &sel.stop_id {
                if seen_stops.insert(stop.clone()) {
                    out.stops.push(stop.clone());
                }
            }
            let names_route =
                sel.route_id.is_some() || (sel.stop_id.is_none() && sel.agency_id.is_some());
            if names_route {
                let key = (sel.route_id.clone(), sel.agency_id.clone());
                if seen_routes.insert(key.clone()) {
                    out.routes.push(key);
                }
            }
        }
        out
    }

    pub fn is_rail(&self) -> bool {
        self.agencies
            .iter()
            .any(|a| RAIL_AGENCY_IDS.contains(&a.as_str()))
    }

    /// Replace the stop group with the given stop numbers (deduplicated).
    pub fn replace_stops(&mut self, stop_ids: Vec<String>) {
        let mut seen = HashSet::new();
        self.stops = stop_ids
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
    }

    pub fn into_selectors(self) -> Vec<EntitySelector> {
        let mut out = self.trips;
        out.extend(self.stops.into_iter().map(EntitySelector::for_stop));
        out.extend(
            self.routes
                .into_iter()
                .map(|(route, agency)| EntitySelector::for_route(route, agency)),
        );
        out
    }
}

fn re_stop_number() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b2\d{5,}\b").expect("stop number regex"))
}

/// Stop numbers (6+ digits, leading `2`) mentioned in free text, in order of appearance.
pub fn stop_numbers_in(text: &str) -> Vec<String> {
    re_stop_number()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Swap a generic precinct stop for the specific stops named in the text.
///
/// Applies only to non-rail alerts that already name a stop. Returns whether
/// the stop group was replaced.
pub fn reinterpret_stops(entities: &mut InformedEntities, desc_txt: Option<&str>) -> bool {
    if entities.stops.is_empty() || entities.is_rail() {
        return false;
    }
    let Some(text) = desc_txt else {
        return false;
    };
    let numbers = stop_numbers_in(text);
    if numbers.is_empty() {
        return false;
    }
    entities.replace_stops(numbers);
    true
}
