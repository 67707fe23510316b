//! Contains common, primitive types shared by every Tiltclock module.
//!
//! This module defines the ID types used to identify scheduled tasks and
//! alarms, plus the `Feature` enumeration naming the four panels. Using
//! distinct types improves type safety and code clarity.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

/// A prelude module for convenient importing of the most common Tiltclock types.
///
/// # Example
/// ```
/// use tiltclock::common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{AlarmId, Feature, TaskId};
    pub use crate::config::TiltclockConfig;
    pub use crate::engine::TiltclockEngine;
}

new_key_type! {
    /// Uniquely and safely identifies a task registered with the `Scheduler`.
    ///
    /// The key is returned when a recurring or one-shot task is armed. It is
    /// never reused, so cancelling with a stale handle is a harmless no-op.
    pub struct TaskId;
}

/// Identifies a single alarm.
///
/// Persisted as a plain JSON number. Ids are only required to be unique
/// within one alarm list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four mutually exclusive panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Alarm,
    Stopwatch,
    Timer,
    Weather,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Alarm,
        Feature::Stopwatch,
        Feature::Timer,
        Feature::Weather,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Feature::Alarm => "alarm clock",
            Feature::Stopwatch => "stopwatch",
            Feature::Timer => "timer",
            Feature::Weather => "weather",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
