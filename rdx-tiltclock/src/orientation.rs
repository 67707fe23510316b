//! Maps raw viewport signals to one of four device orientations.
//!
//! Classification is total: every `(width, height, angle)` triple yields
//! exactly one `Orientation`. The `OrientationTracker` adds edge triggering,
//! reporting a change only when the classification differs from the last one.

use crate::common::Feature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four physical device attitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    PortraitUpright,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    /// The panel shown for this orientation.
    pub fn feature(self) -> Feature {
        match self {
            Orientation::PortraitUpright => Feature::Alarm,
            Orientation::LandscapeRight => Feature::Stopwatch,
            Orientation::PortraitUpsideDown => Feature::Timer,
            Orientation::LandscapeLeft => Feature::Weather,
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(
            self,
            Orientation::LandscapeLeft | Orientation::LandscapeRight
        )
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Orientation::PortraitUpright => "portrait-upright",
            Orientation::PortraitUpsideDown => "portrait-upside-down",
            Orientation::LandscapeLeft => "landscape-left",
            Orientation::LandscapeRight => "landscape-right",
        };
        f.write_str(name)
    }
}

/// A raw reading from the host: viewport size and the legacy rotation angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSignal {
    pub width: u32,
    pub height: u32,
    /// 0, 90, 180 or 270 (some hosts report -90). `None` when the host
    /// never reports an angle, which is treated as 0.
    pub angle: Option<i16>,
}

impl ViewportSignal {
    pub fn new(width: u32, height: u32, angle: Option<i16>) -> Self {
        Self {
            width,
            height,
            angle,
        }
    }
}

/// Classifies a viewport signal.
///
/// `threshold` is the fallback for hosts without an angle: a wide landscape
/// viewport counts as landscape-right, a tall portrait viewport as upright.
pub fn classify(signal: ViewportSignal, threshold: u32) -> Orientation {
    let angle = signal.angle.unwrap_or(0);
    if signal.width > signal.height {
        if angle == 90 || signal.width > threshold {
            Orientation::LandscapeRight
        } else {
            Orientation::LandscapeLeft
        }
    } else if angle == 0 || signal.height > threshold {
        Orientation::PortraitUpright
    } else {
        Orientation::PortraitUpsideDown
    }
}

/// A classification that differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationChange {
    pub from: Option<Orientation>,
    pub to: Orientation,
}

/// Edge-triggered classifier.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    threshold: u32,
    last: Option<Orientation>,
}

impl OrientationTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last: None,
        }
    }

    pub fn current(&self) -> Option<Orientation> {
        self.last
    }

    /// Classifies `signal`, returning a change only when the result differs
    /// from the previous classification.
    pub fn observe(&mut self, signal: ViewportSignal) -> Option<OrientationChange> {
        let next = classify(signal, self.threshold);
        if self.last == Some(next) {
            return None;
        }
        let change = OrientationChange {
            from: self.last,
            to: next,
        };
        self.last = Some(next);
        Some(change)
    }
}
