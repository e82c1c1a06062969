// src/pipeline.rs
//! decode → index → match + enrich → stamp → partition.

use metrics::{counter, gauge, histogram};
use std::time::Instant;

use crate::enrich::enrich_alert;
use crate::error::PipelineError;
use crate::feed::{decode_feed, FeedMessage, OUTPUT_GTFS_REALTIME_VERSION};
use crate::matcher::{match_alert, MatchOutcome};
use crate::metadata::MetadataIndex;
use crate::partition::{partition, AlertFeeds};
use crate::upstream::AlertSource;

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub entities: usize,
    pub alerts: usize,
    pub matched: usize,
    pub missed: usize,
    pub without_url: usize,
    pub severity_set: usize,
    pub speech_text_set: usize,
    pub headers_annotated: usize,
    pub stops_reinterpreted: usize,
}

/// Enrich every alert of `feed` in place.
pub fn enrich_feed(feed: &mut FeedMessage, index: &MetadataIndex) -> RunStats {
    let mut stats = RunStats {
        entities: feed.entity.len(),
        ..Default::default()
    };

    for entity in feed.entity.iter_mut() {
        let Some(alert) = entity.alert.as_mut() else {
            continue;
        };
        stats.alerts += 1;

        let record = match match_alert(alert, index) {
            MatchOutcome::Matched(rec) => {
                stats.matched += 1;
                Some(rec)
            }
            MatchOutcome::Miss(key) => {
                stats.missed += 1;
                tracing::debug!(target: "pipeline", entity = %entity.id, %key, "no metadata record");
                None
            }
            MatchOutcome::NoUrl => {
                stats.without_url += 1;
                tracing::warn!(
                    target: "pipeline",
                    entity = %entity.id,
                    "alert has no url translation, skipping metadata match"
                );
                None
            }
        };

        let report = enrich_alert(alert, record);
        stats.severity_set += usize::from(report.severity.is_some());
        stats.speech_text_set += usize::from(report.speech_text);
        stats.headers_annotated += usize::from(report.header_rule.is_some());
        stats.stops_reinterpreted += usize::from(report.stops_reinterpreted);
    }

    stats
}

/// Decode the primary payload, enrich it against the metadata payload and
/// stamp the output version.
pub fn run(primary: &[u8], metadata: &[u8]) -> Result<(FeedMessage, RunStats), PipelineError> {
    let mut feed = decode_feed(primary)?;
    let index = MetadataIndex::from_json(metadata)?;
    let stats = enrich_feed(&mut feed, &index);
    feed.header.gtfs_realtime_version = OUTPUT_GTFS_REALTIME_VERSION.to_string();
    Ok((feed, stats))
}

/// `run` followed by partitioning into the two served views.
pub fn build_feeds(primary: &[u8], metadata: &[u8]) -> Result<AlertFeeds, PipelineError> {
    let t0 = Instant::now();
    let (feed, stats) = run(primary, metadata)?;
    let feeds = partition(feed);

    histogram!("alerts_pipeline_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("alerts_enriched_total").increment(stats.alerts as u64);
    counter!("alerts_matched_total").increment(stats.matched as u64);
    gauge!("alerts_last_refresh_ts").set(feeds.generated_at.timestamp() as f64);

    tracing::info!(
        target: "pipeline",
        entities = stats.entities,
        alerts = stats.alerts,
        matched = stats.matched,
        missed = stats.missed,
        without_url = stats.without_url,
        annotated = stats.headers_annotated,
        normal = feeds.normal.entity.len(),
        "alert feed rebuilt"
    );
    Ok(feeds)
}

/// Fetch both upstream payloads concurrently and build the feeds.
pub async fn refresh(source: &dyn AlertSource) -> Result<AlertFeeds, PipelineError> {
    let (primary, metadata) = tokio::try_join!(source.fetch_alerts(), source.fetch_metadata())?;
    build_feeds(&primary, &metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{encode_feed, Alert, FeedEntity, FeedHeader, SeverityLevel, TranslatedString};
    use crate::upstream::FixtureSource;

    fn alert_entity(id: &str, key: Option<&str>) -> FeedEntity {
        FeedEntity {
            id: id.into(),
            is_deleted: None,
            alert: Some(Alert {
                url: key.map(|k| TranslatedString::english(format!("https://x.example/#/{k}"))),
                header_text: Some(TranslatedString::english("Notice")),
                ..Default::default()
            }),
        }
    }

    fn primary() -> Vec<u8> {
        encode_feed(&FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "1.0".into(),
                ..Default::default()
            },
            entity: vec![
                alert_entity("1", Some("k1")),
                alert_entity("2", Some("nope")),
                alert_entity("3", None),
                FeedEntity {
                    id: "4".into(),
                    ..Default::default()
                },
            ],
        })
    }

    const META: &[u8] = br#"{"infos":{"current":[{"id":"k1","priority":"low"}]}}"#;

    #[test]
    fn run_counts_outcomes_and_stamps_version() {
        let (feed, stats) = run(&primary(), META).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "2.0");
        assert_eq!(stats.entities, 4);
        assert_eq!(stats.alerts, 3);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.missed, 1);
        assert_eq!(stats.without_url, 1);
        assert_eq!(stats.severity_set, 1);
        assert_eq!(
            feed.entity[0].alert.as_ref().unwrap().severity_level,
            Some(SeverityLevel::Info as i32)
        );
    }

    #[test]
    fn build_feeds_partitions_info_out_of_normal() {
        let feeds = build_feeds(&primary(), META).unwrap();
        assert_eq!(feeds.all.entity.len(), 4);
        assert_eq!(feeds.normal.entity.len(), 3);
        assert_eq!(feeds.normal.header.gtfs_realtime_version, "2.0");
    }

    #[test]
    fn decode_failure_aborts_run() {
        assert!(matches!(
            run(&[0xff, 0x01], META),
            Err(PipelineError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn refresh_fetches_both_payloads() {
        let src = FixtureSource::new(primary(), META.to_vec());
        let feeds = refresh(&src).await.unwrap();
        assert_eq!(feeds.all.entity.len(), 4);
        assert_eq!(src.fetch_count(), 1);
        assert_eq!(src.metadata_fetch_count(), 1);

        src.set_failing(true);
        assert!(matches!(
            refresh(&src).await,
            Err(PipelineError::Upstream { .. })
        ));
    }
}
