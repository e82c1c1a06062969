// src/feed.rs
//! GTFS-Realtime alert schema (the subset this service reads and writes),
//! declared directly with `prost` derives so no protoc step is needed.
//!
//! Tags follow the public `gtfs-realtime.proto`. Entities carrying trip updates
//! or vehicle positions are not modelled; those payloads are dropped on decode.

use prost::Message;
use serde::{Serialize, Serializer};

use crate::error::PipelineError;

/// Version string stamped on every feed this service emits.
pub const OUTPUT_GTFS_REALTIME_VERSION: &str = "2.0";

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    #[prost(message, required, tag = "1")]
    pub header: FeedHeader,
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedHeader {
    #[prost(string, required, tag = "1")]
    pub gtfs_realtime_version: String,
    #[prost(enumeration = "Incrementality", optional, tag = "2")]
    #[serde(
        serialize_with = "ser_incrementality",
        skip_serializing_if = "Option::is_none"
    )]
    pub incrementality: Option<i32>,
    #[prost(uint64, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntity {
    #[prost(string, required, tag = "1")]
    pub id: String,
    #[prost(bool, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,
    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[prost(message, repeated, tag = "1")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub active_period: Vec<TimeRange>,
    #[prost(message, repeated, tag = "5")]
    pub informed_entity: Vec<EntitySelector>,
    #[prost(enumeration = "Cause", optional, tag = "6")]
    #[serde(serialize_with = "ser_cause", skip_serializing_if = "Option::is_none")]
    pub cause: Option<i32>,
    #[prost(enumeration = "Effect", optional, tag = "7")]
    #[serde(serialize_with = "ser_effect", skip_serializing_if = "Option::is_none")]
    pub effect: Option<i32>,
    #[prost(message, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<TranslatedString>,
    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_header_text: Option<TranslatedString>,
    #[prost(message, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_description_text: Option<TranslatedString>,
    #[prost(enumeration = "SeverityLevel", optional, tag = "14")]
    #[serde(
        serialize_with = "ser_severity",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity_level: Option<i32>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct TimeRange {
    #[prost(uint64, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

/// "This alert affects X": a trip, a stop, or a route/agency.
#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySelector {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[prost(int32, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_type: Option<i32>,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip: Option<TripDescriptor>,
    #[prost(string, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<u32>,
}

impl EntitySelector {
    pub fn for_stop(stop_id: impl Into<String>) -> Self {
        Self {
            stop_id: Some(stop_id.into()),
            ..Default::default()
        }
    }

    pub fn for_route(route_id: Option<String>, agency_id: Option<String>) -> Self {
        Self {
            route_id,
            agency_id,
            ..Default::default()
        }
    }

    pub fn for_trip(trip: TripDescriptor) -> Self {
        Self {
            trip: Some(trip),
            ..Default::default()
        }
    }
}

#[derive(Clone, PartialEq, Message, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[prost(string, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    // Enum on the wire; kept as the raw value since nothing here interprets it.
    #[prost(int32, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_relationship: Option<i32>,
    #[prost(string, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[prost(uint32, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<u32>,
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct TranslatedString {
    #[prost(message, repeated, tag = "1")]
    pub translation: Vec<Translation>,
}

impl TranslatedString {
    /// A single English translation.
    pub fn english(text: impl Into<String>) -> Self {
        Self {
            translation: vec![Translation::new(text, Some("en"))],
        }
    }
}

#[derive(Clone, PartialEq, Message, Serialize)]
pub struct Translation {
    #[prost(string, required, tag = "1")]
    pub text: String,
    #[prost(string, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Translation {
    pub fn new(text: impl Into<String>, language: Option<&str>) -> Self {
        Self {
            text: text.into(),
            language: language.map(str::to_string),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Incrementality {
    FullDataset = 0,
    Differential = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Cause {
    UnknownCause = 1,
    OtherCause = 2,
    TechnicalProblem = 3,
    Strike = 4,
    Demonstration = 5,
    Accident = 6,
    Holiday = 7,
    Weather = 8,
    Maintenance = 9,
    Construction = 10,
    PoliceActivity = 11,
    MedicalEmergency = 12,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Effect {
    NoService = 1,
    ReducedService = 2,
    SignificantDelays = 3,
    Detour = 4,
    AdditionalService = 5,
    ModifiedService = 6,
    OtherEffect = 7,
    UnknownEffect = 8,
    StopMoved = 9,
    NoEffect = 10,
    AccessibilityIssue = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SeverityLevel {
    UnknownSeverity = 1,
    Info = 2,
    Warning = 3,
    Severe = 4,
}

/// Names used in the JSON rendering, matching the `.proto` enum value names.
trait ProtoName {
    fn proto_name(self) -> &'static str;
}

impl ProtoName for Incrementality {
    fn proto_name(self) -> &'static str {
        match self {
            Incrementality::FullDataset => "FULL_DATASET",
            Incrementality::Differential => "DIFFERENTIAL",
        }
    }
}

impl ProtoName for Cause {
    fn proto_name(self) -> &'static str {
        match self {
            Cause::UnknownCause => "UNKNOWN_CAUSE",
            Cause::OtherCause => "OTHER_CAUSE",
            Cause::TechnicalProblem => "TECHNICAL_PROBLEM",
            Cause::Strike => "STRIKE",
            Cause::Demonstration => "DEMONSTRATION",
            Cause::Accident => "ACCIDENT",
            Cause::Holiday => "HOLIDAY",
            Cause::Weather => "WEATHER",
            Cause::Maintenance => "MAINTENANCE",
            Cause::Construction => "CONSTRUCTION",
            Cause::PoliceActivity => "POLICE_ACTIVITY",
            Cause::MedicalEmergency => "MEDICAL_EMERGENCY",
        }
    }
}

impl ProtoName for Effect {
    fn proto_name(self) -> &'static str {
        match self {
            Effect::NoService => "NO_SERVICE",
            Effect::ReducedService => "REDUCED_SERVICE",
            Effect::SignificantDelays => "SIGNIFICANT_DELAYS",
            Effect::Detour => "DETOUR",
            Effect::AdditionalService => "ADDITIONAL_SERVICE",
            Effect::ModifiedService => "MODIFIED_SERVICE",
            Effect::OtherEffect => "OTHER_EFFECT",
            Effect::UnknownEffect => "UNKNOWN_EFFECT",
            Effect::StopMoved => "STOP_MOVED",
            Effect::NoEffect => "NO_EFFECT",
            Effect::AccessibilityIssue => "ACCESSIBILITY_ISSUE",
        }
    }
}

impl ProtoName for SeverityLevel {
    fn proto_name(self) -> &'static str {
        match self {
            SeverityLevel::UnknownSeverity => "UNKNOWN_SEVERITY",
            SeverityLevel::Info => "INFO",
            SeverityLevel::Warning => "WARNING",
            SeverityLevel::Severe => "SEVERE",
        }
    }
}

// Unknown wire values fall back to the raw number rather than failing the render.
fn ser_enum<E, S>(value: &Option<i32>, s: S) -> Result<S::Ok, S::Error>
where
    E: ProtoName + TryFrom<i32>,
    S: Serializer,
{
    match value {
        Some(raw) => match E::try_from(*raw) {
            Ok(e) => s.serialize_str(e.proto_name()),
            Err(_) => s.serialize_i32(*raw),
        },
        None => s.serialize_none(),
    }
}

fn ser_incrementality<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    ser_enum::<Incrementality, S>(v, s)
}

fn ser_cause<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    ser_enum::<Cause, S>(v, s)
}

fn ser_effect<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    ser_enum::<Effect, S>(v, s)
}

fn ser_severity<S: Serializer>(v: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    ser_enum::<SeverityLevel, S>(v, s)
}

/// Parse a binary GTFS-Realtime payload.
pub fn decode_feed(bytes: &[u8]) -> Result<FeedMessage, PipelineError> {
    FeedMessage::decode(bytes).map_err(|e| PipelineError::Decode(e.to_string()))
}

/// Serialize a feed back to the binary wire format.
pub fn encode_feed(feed: &FeedMessage) -> Vec<u8> {
    feed.encode_to_vec()
}
