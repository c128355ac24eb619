//! Realtime payload encoding.
//!
//! The JSON shape pushed by a hosted realtime channel. Feed implementations
//! that receive raw payloads decode them through [`ChangeEvent::from_json`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ChangeEvent, FeedError};
use crate::thing::{Thing, ThingId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum EventType {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    #[serde(rename = "eventType")]
    event_type: EventType,
    #[serde(default)]
    new: Value,
    #[serde(default)]
    old: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OldKey {
    id: ThingId,
}

pub(super) fn decode(json: &str) -> Result<ChangeEvent, FeedError> {
    let payload: Payload =
        serde_json::from_str(json).map_err(|e| FeedError::Malformed(e.to_string()))?;

    match payload.event_type {
        EventType::Insert => Ok(ChangeEvent::Insert(record(payload.new)?)),
        EventType::Update => Ok(ChangeEvent::Update(record(payload.new)?)),
        EventType::Delete => {
            let old: OldKey = serde_json::from_value(payload.old)
                .map_err(|e| FeedError::Malformed(format!("delete without old.id: {}", e)))?;
            Ok(ChangeEvent::Delete(old.id))
        }
    }
}

fn record(value: Value) -> Result<Thing, FeedError> {
    serde_json::from_value(value).map_err(|e| FeedError::Malformed(e.to_string()))
}

pub(super) fn encode(event: &ChangeEvent) -> Result<String, FeedError> {
    let to_value = |thing: &Thing| {
        serde_json::to_value(thing).map_err(|e| FeedError::Malformed(e.to_string()))
    };

    let payload = match event {
        ChangeEvent::Insert(thing) => Payload {
            event_type: EventType::Insert,
            new: to_value(thing)?,
            old: Value::Object(Default::default()),
        },
        ChangeEvent::Update(thing) => Payload {
            event_type: EventType::Update,
            new: to_value(thing)?,
            old: serde_json::json!({ "id": thing.id }),
        },
        ChangeEvent::Delete(id) => Payload {
            event_type: EventType::Delete,
            new: Value::Object(Default::default()),
            old: serde_json::json!({ "id": id }),
        },
    };

    serde_json::to_string(&payload).map_err(|e| FeedError::Malformed(e.to_string()))
}
