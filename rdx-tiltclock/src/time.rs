//! Wall-clock sources.
//!
//! The clock panel and alarm matching ask a `WallClock` for the local date and
//! time instead of reading the system clock directly, so tests can pin the
//! time of day.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

/// A source of local (timezone-adjusted) date and time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the system clock and converts it into the configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemWallClock {
    timezone: Tz,
}

impl SystemWallClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl WallClock for SystemWallClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }
}

/// A wall clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// hand another to the application.
#[derive(Debug, Clone)]
pub struct ManualWallClock {
    current: Arc<Mutex<NaiveDateTime>>,
}

impl ManualWallClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.lock() = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut current = self.lock();
        *current += by;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        // A poisoned lock still holds a valid timestamp.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WallClock for ManualWallClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock()
    }
}
