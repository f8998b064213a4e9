//! Run events and their wire encoding
//!
//! The core produces [`RunEvent`]s. Transports send them as JSON text
//! tagged by a `method` field: one `init` per accepted request, then one
//! `data` per tick.

use crate::params::{Limits, SimulationParameters};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Metres to centimetres, applied to `position` on the wire
pub const POSITION_SCALE: f64 = 100.0;

/// Identifies one run within a manager. Increases with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context emitted once per run, before its first sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitEvent {
    pub run: RunId,
    pub params: SimulationParameters,
    pub limits: Limits,
}

/// One tick of a run. `time` is nominal elapsed time in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub run: RunId,
    pub time: f64,
    pub displacement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunEvent {
    Init(InitEvent),
    Sample(Sample),
}

impl RunEvent {
    pub fn run(&self) -> RunId {
        match self {
            Self::Init(init) => init.run,
            Self::Sample(sample) => sample.run,
        }
    }
}

/// Message as seen by subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum WireMessage {
    Init {
        mass: f64,
        spring_constant: f64,
        initial_displacement: f64,
        damping: f64,
        max_mass: f64,
        max_spring_constant: f64,
        max_displacement: f64,
    },
    Data {
        time: f64,
        position: f64,
    },
}

impl From<&RunEvent> for WireMessage {
    fn from(event: &RunEvent) -> Self {
        match event {
            RunEvent::Init(init) => WireMessage::Init {
                mass: init.params.mass,
                spring_constant: init.params.spring_constant,
                initial_displacement: init.params.initial_displacement,
                damping: init.params.damping,
                max_mass: init.limits.max_mass,
                max_spring_constant: init.limits.max_spring_constant,
                max_displacement: init.limits.max_displacement,
            },
            RunEvent::Sample(sample) => WireMessage::Data {
                time: round2(sample.time),
                position: round2(sample.displacement * POSITION_SCALE),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Encode an event as a JSON text frame
pub fn encode(event: &RunEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&WireMessage::from(event))?)
}

/// Round to two decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
