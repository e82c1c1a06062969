// tests/common/mod.rs
// Shared fixtures: a small primary feed and a matching metadata document.
#![allow(dead_code)]

use gtfs_alerts_enricher::feed::{
    encode_feed, Alert, Cause, Effect, EntitySelector, FeedEntity, FeedHeader, FeedMessage,
    TranslatedString, Translation, TripDescriptor,
};

pub fn url_for(key: &str) -> TranslatedString {
    TranslatedString::english(format!("https://transportnsw.info/alerts/details#/{key}"))
}

pub fn entity(id: &str, alert: Alert) -> FeedEntity {
    FeedEntity {
        id: id.into(),
        is_deleted: None,
        alert: Some(alert),
    }
}

pub fn feed(entities: Vec<FeedEntity>) -> FeedMessage {
    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "1.0".into(),
            incrementality: None,
            timestamp: Some(1_760_000_000),
        },
        entity: entities,
    }
}

/// Four alerts: a low-priority lift outage on rail, a normal-priority bus
/// detour with stop numbers in the text, an unmatched weather alert, and one
/// without a URL.
pub fn sample_feed() -> FeedMessage {
    feed(vec![
        entity(
            "lift",
            Alert {
                url: Some(url_for("ems-1")),
                cause: Some(Cause::Maintenance as i32),
                effect: Some(Effect::ModifiedService as i32),
                header_text: Some(TranslatedString::english("Lift at Central not available")),
                description_text: Some(TranslatedString {
                    translation: vec![Translation::new(
                        "<div>Delay</div><li>due to works</li>",
                        Some("en/html"),
                    )],
                }),
                informed_entity: vec![
                    EntitySelector::for_route(Some("T1".into()), Some("SydneyTrains".into())),
                    EntitySelector::for_route(Some("T1".into()), Some("SydneyTrains".into())),
                ],
                ..Default::default()
            },
        ),
        entity(
            "detour",
            Alert {
                url: Some(url_for("ems-2")),
                effect: Some(Effect::Detour as i32),
                header_text: Some(TranslatedString::english(" Buses detour ")),
                description_text: Some(TranslatedString::english(
                    "Use temporary stops 201234 and 205678",
                )),
                informed_entity: vec![
                    EntitySelector::for_trip(TripDescriptor {
                        trip_id: Some("trip-9".into()),
                        ..Default::default()
                    }),
                    EntitySelector::for_stop("200060"),
                    EntitySelector::for_route(Some("333".into()), Some("2436".into())),
                    EntitySelector::for_stop("200060"),
                ],
                ..Default::default()
            },
        ),
        entity(
            "weather",
            Alert {
                url: Some(url_for("not-in-metadata")),
                cause: Some(Cause::Weather as i32),
                header_text: Some(TranslatedString::english("Storm damage")),
                ..Default::default()
            },
        ),
        entity(
            "no-url",
            Alert {
                header_text: Some(TranslatedString::english("Bus stop closure on George St")),
                ..Default::default()
            },
        ),
    ])
}

pub fn sample_primary() -> Vec<u8> {
    encode_feed(&sample_feed())
}

pub const SAMPLE_METADATA: &str = r#"{
  "infos": {
    "current": [
      { "id": "ems-1", "priority": "low",
        "properties": { "speechText": "<speak><p>The lift at Central is not available.</p></speak>" } },
      { "id": "ems-2", "priority": "normal", "properties": {} },
      { "id": "ems-3", "priority": "veryHigh" }
    ]
  }
}"#;
