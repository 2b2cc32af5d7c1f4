//! Wire format shared with the simulation server.
//!
//! Every WebSocket text frame carries one JSON envelope
//! `{"event": "<name>", "data": <payload>}`. Inbound frames are decoded in two
//! steps (envelope, then the payload for the named event) so a bad payload can
//! be reported against the event that carried it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::renderer::color::{self, WHITE};
use crate::telemetry::TelemetryRow;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("malformed `{event}` payload: {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown event `{0}`")]
    UnknownEvent(String),
}

/// One vehicle as reported by a single `update`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct VehicleSnapshot {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    /// Heading in radians.
    pub angle: f64,
    #[serde(deserialize_with = "hex_color")]
    pub color: [u8; 3],
    #[serde(deserialize_with = "flag")]
    pub alive: bool,
    #[serde(default, deserialize_with = "flag")]
    pub crashed: bool,
    /// `(distance, relative angle)` per ray.
    #[serde(default)]
    pub sensors: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct UpdatePayload {
    pub cars: Vec<VehicleSnapshot>,
    pub alive: u32,
    #[serde(default)]
    pub steps: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct GenerationPayload {
    pub generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct PausePayload {
    pub paused: bool,
}

/// Server to client.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Update(UpdatePayload),
    Reset(GenerationPayload),
    HardReset(GenerationPayload),
    PauseState(PausePayload),
    GenLog(TelemetryRow),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Update(_) => "update",
            ServerEvent::Reset(_) => "reset",
            ServerEvent::HardReset(_) => "hard_reset",
            ServerEvent::PauseState(_) => "pause_state",
            ServerEvent::GenLog(_) => "gen_log",
        }
    }
}

/// Client to server. Serializes straight into the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    TogglePause,
    RestartSim,
    SetSpeed { speed: u32 },
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Decode one text frame.
pub fn decode(text: &str) -> Result<ServerEvent, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Envelope)?;
    let data = envelope.data;
    let event = match envelope.event.as_str() {
        "update" => ServerEvent::Update(payload("update", data)?),
        "reset" => ServerEvent::Reset(payload("reset", data)?),
        "hard_reset" => ServerEvent::HardReset(payload("hard_reset", data)?),
        "pause_state" => ServerEvent::PauseState(payload("pause_state", data)?),
        "gen_log" => ServerEvent::GenLog(payload("gen_log", data)?),
        _ => return Err(ProtocolError::UnknownEvent(envelope.event)),
    };
    Ok(event)
}

fn payload<T: serde::de::DeserializeOwned>(
    event: &'static str,
    data: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::Payload { event, source })
}

/// Accepts `true`/`false` as well as the `0`/`1` integers the server sends.
fn flag<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(de)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

fn hex_color<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 3], D::Error> {
    let s = String::deserialize(de)?;
    Ok(color::parse_hex(&s).unwrap_or_else(|| {
        warn!(color = %s, "unparseable vehicle color, using white");
        WHITE
    }))
}
