pub mod controller;
pub mod session;
pub mod source;
pub mod store;

use std::time::{SystemTime, UNIX_EPOCH};

pub use controller::{RecordingState, SessionController};
use serde::{Deserialize, Serialize};
pub use session::Session;
pub use source::{ReplaySampleSource, SampleSource};
pub use store::SampleStore;

/// One speed observation accepted into a session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Speed in meters per second. Negative when the source had no valid fix.
    pub speed_mps: f64,
    /// Seconds since the Unix epoch
    pub timestamp_s: f64,
}

impl Sample {
    pub fn new(speed_mps: f64, timestamp_s: f64) -> Self {
        Self {
            speed_mps,
            timestamp_s,
        }
    }
}

/// A raw update as delivered by a [`SampleSource`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocationFix {
    #[serde(default)]
    pub speed_mps: Option<f64>,
    pub timestamp_s: f64,
}

impl LocationFix {
    pub fn new(speed_mps: f64, timestamp_s: f64) -> Self {
        Self {
            speed_mps: Some(speed_mps),
            timestamp_s,
        }
    }

    /// A fix that carried no speed reading
    pub fn without_speed(timestamp_s: f64) -> Self {
        Self {
            speed_mps: None,
            timestamp_s,
        }
    }

    pub fn sample(&self) -> Option<Sample> {
        self.speed_mps
            .map(|speed_mps| Sample::new(speed_mps, self.timestamp_s))
    }
}

pub(crate) fn now_epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.)
}
