// src/partition.rs
//! Split one enriched feed into the "all" and "normal" views.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;

use crate::feed::{FeedEntity, FeedMessage, SeverityLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFeedKind {
    All,
    Normal,
}

impl FromStr for AlertFeedKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AlertFeedKind::All),
            "normal" => Ok(AlertFeedKind::Normal),
            _ => Err(()),
        }
    }
}

/// Both views from one pipeline run. Read-only once built.
#[derive(Debug, Clone)]
pub struct AlertFeeds {
    pub all: Arc<FeedMessage>,
    pub normal: Arc<FeedMessage>,
    pub generated_at: DateTime<Utc>,
}

impl AlertFeeds {
    pub fn get(&self, kind: AlertFeedKind) -> &Arc<FeedMessage> {
        match kind {
            AlertFeedKind::All => &self.all,
            AlertFeedKind::Normal => &self.normal,
        }
    }
}

fn is_info(entity: &FeedEntity) -> bool {
    entity
        .alert
        .as_ref()
        .and_then(|a| a.severity_level)
        .is_some_and(|s| s == SeverityLevel::Info as i32)
}

/// "normal" keeps the header and every entity whose severity is not INFO.
pub fn partition(feed: FeedMessage) -> AlertFeeds {
    let normal = FeedMessage {
        header: feed.header.clone(),
        entity: feed
            .entity
            .iter()
            .filter(|e| !is_info(e))
            .cloned()
            .collect(),
    };
    AlertFeeds {
        all: Arc::new(feed),
        normal: Arc::new(normal),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Alert, FeedHeader};

    fn entity(id: &str, severity: Option<SeverityLevel>) -> FeedEntity {
        FeedEntity {
            id: id.into(),
            is_deleted: None,
            alert: Some(Alert {
                severity_level: severity.map(|s| s as i32),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn normal_drops_only_info() {
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".into(),
                ..Default::default()
            },
            entity: vec![
                entity("a", Some(SeverityLevel::Info)),
                entity("b", Some(SeverityLevel::Warning)),
                entity("c", None),
                entity("d", Some(SeverityLevel::Info)),
                FeedEntity {
                    id: "e".into(),
                    ..Default::default()
                },
            ],
        };
        let feeds = partition(feed);
        assert_eq!(feeds.all.entity.len(), 5);
        let ids: Vec<_> = feeds.normal.entity.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "e"]);
        assert_eq!(feeds.normal.header, feeds.all.header);

        // Every normal entity is the same value as in "all".
        for e in feeds.normal.entity.iter() {
            assert!(feeds.all.entity.contains(e));
        }
    }

    #[test]
    fn kind_parses_from_path_segment() {
        assert_eq!("all".parse::<AlertFeedKind>(), Ok(AlertFeedKind::All));
        assert_eq!("normal".parse::<AlertFeedKind>(), Ok(AlertFeedKind::Normal));
        assert!("ALL".parse::<AlertFeedKind>().is_err());
        assert!("severe".parse::<AlertFeedKind>().is_err());
    }
}
