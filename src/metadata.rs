// src/metadata.rs
//! Secondary (JSON) feed model and the per-run lookup index built from it.

use serde::Deserialize;
use std::collections::HashMap;

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub infos: Infos,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Infos {
    #[serde(default)]
    pub current: Vec<MetadataRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MetadataRecord {
    #[serde(default)]
    pub id: String,
    /// Free-form severity hint, e.g. "low" or "normal".
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub properties: RecordProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProperties {
    /// HTML-ish text meant for speech synthesis.
    #[serde(default)]
    pub speech_text: Option<String>,
}

/// Lookup from record id to record. Rebuilt on every pipeline run.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    by_id: HashMap<String, MetadataRecord>,
}

impl MetadataIndex {
    /// Index records by id. On duplicate ids the last occurrence wins.
    pub fn build(records: Vec<MetadataRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for rec in records {
            by_id.insert(rec.id.clone(), rec);
        }
        Self { by_id }
    }

    /// Parse the secondary feed body and index its current records.
    pub fn from_json(bytes: &[u8]) -> Result<Self, PipelineError> {
        let doc: MetadataDocument = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::upstream("metadata", format!("parsing json: {e}")))?;
        Ok(Self::build(doc.infos.current))
    }

    pub fn get(&self, id: &str) -> Option<&MetadataRecord> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_records_with_optional_speech_text() {
        let body = br#"{"infos":{"current":[
            {"id":"a","priority":"low","properties":{"speechText":"<p>Hi</p>"}},
            {"id":"b","priority":"normal","properties":{}}
        ]}}"#;
        let idx = MetadataIndex::from_json(body).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(
            idx.get("a").unwrap().properties.speech_text.as_deref(),
            Some("<p>Hi</p>")
        );
        assert_eq!(idx.get("b").unwrap().priority.as_deref(), Some("normal"));
        assert!(idx.get("b").unwrap().properties.speech_text.is_none());
    }

    #[test]
    fn missing_list_yields_empty_index() {
        assert!(MetadataIndex::from_json(br#"{}"#).unwrap().is_empty());
        assert!(MetadataIndex::from_json(br#"{"infos":{}}"#).unwrap().is_empty());
    }

    #[test]
    fn last_duplicate_wins() {
        let body = br#"{"infos":{"current":[
            {"id":"x","priority":"low"},
            {"id":"x","priority":"normal"}
        ]}}"#;
        let idx = MetadataIndex::from_json(body).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("x").unwrap().priority.as_deref(), Some("normal"));
    }

    #[test]
    fn malformed_json_is_upstream_error() {
        let err = MetadataIndex::from_json(b"not json").unwrap_err();
        assert!(matches!(err, PipelineError::Upstream { .. }));
    }
}
