//! The alarm list: creation, deletion, persistence and minute matching.

use crate::common::{AlarmId, Feature};
use crate::error::{Result, TiltError};
use crate::events::{Effect, Severity};
use crate::format;
use crate::storage::KeyValueStore;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Vibration pattern played when an alarm fires.
pub const ALARM_VIBRATION: [u64; 5] = [500, 200, 500, 200, 500];

/// A single alarm. Persisted as `{"id": 1, "time": "07:00", "active": true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    pub active: bool,
}

impl Alarm {
    /// Whether this alarm matches `now` truncated to the minute.
    pub fn matches(&self, now: NaiveTime) -> bool {
        self.time.hour() == now.hour() && self.time.minute() == now.minute()
    }

    pub fn label(&self) -> String {
        format::time_of_day(self.time)
    }
}

/// Parses user input in `HH:MM` form.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| {
        TiltError::InvalidConfiguration(format!("'{}' is not a HH:MM time", input.trim()))
    })
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

/// Owns the alarm list and its durable copy.
pub struct AlarmManager {
    alarms: Vec<Alarm>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    effect_duration: Duration,
}

impl AlarmManager {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, effect_duration: Duration) -> Self {
        Self {
            alarms: Vec::new(),
            store,
            key: key.into(),
            effect_duration,
        }
    }

    /// Replaces the in-memory list with the stored one.
    ///
    /// Missing, unreadable or malformed data yields an empty list. Returns the
    /// number of alarms loaded.
    pub fn load(&mut self) -> usize {
        self.alarms = match self.read_stored() {
            Ok(alarms) => alarms,
            Err(e) => {
                warn!(code = e.code(), error = %e, "ignoring stored alarms");
                Vec::new()
            }
        };
        info!(count = self.alarms.len(), "alarms loaded");
        self.alarms.len()
    }

    fn read_stored(&self) -> Result<Vec<Alarm>> {
        match self.store.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Writes the full list under the configured key.
    pub fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.alarms)?;
        self.store.set(&self.key, &raw)
    }

    /// Adds an active alarm with a fresh id.
    ///
    /// The alarm stays in the list even if persisting fails; the error is
    /// returned so the caller can surface it.
    pub fn add_alarm(&mut self, time: NaiveTime) -> Result<Alarm> {
        let alarm = Alarm {
            id: self.next_id(),
            time,
            active: true,
        };
        self.alarms.push(alarm.clone());
        info!(id = %alarm.id, time = %alarm.label(), "alarm added");
        self.persist()?;
        Ok(alarm)
    }

    /// Removes an alarm. Returns `false` (and writes nothing) if the id is unknown.
    pub fn delete_alarm(&mut self, id: AlarmId) -> Result<bool> {
        let before = self.alarms.len();
        self.alarms.retain(|alarm| alarm.id != id);
        if self.alarms.len() == before {
            debug!(%id, "delete ignored, no such alarm");
            return Ok(false);
        }
        info!(%id, "alarm deleted");
        self.persist()?;
        Ok(true)
    }

    /// Flips an alarm between armed and disarmed. Returns the new state.
    pub fn toggle_alarm(&mut self, id: AlarmId) -> Result<Option<bool>> {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            return Ok(None);
        };
        alarm.active = !alarm.active;
        let active = alarm.active;
        info!(%id, active, "alarm toggled");
        self.persist()?;
        Ok(Some(active))
    }

    /// Fires every active alarm matching `now` and disarms it.
    ///
    /// A fired alarm is inactive afterwards, so repeated checks within the
    /// same minute never fire it twice.
    pub fn check_alarms(&mut self, now: NaiveTime) -> Vec<Alarm> {
        let mut fired = Vec::new();
        for alarm in self.alarms.iter_mut().filter(|a| a.active && a.matches(now)) {
            alarm.active = false;
            info!(id = %alarm.id, time = %alarm.label(), "alarm triggered");
            fired.push(alarm.clone());
        }
        if !fired.is_empty() {
            if let Err(e) = self.persist() {
                warn!(code = e.code(), error = %e, "failed to persist fired alarms");
            }
        }
        fired
    }

    /// The bounded effects played for a fired alarm.
    pub fn trigger_effects(&self, alarm: &Alarm) -> Vec<Effect> {
        vec![
            Effect::notify(
                "Alarm",
                format!("It's {}", alarm.label()),
                "alarm",
                Severity::Info,
            ),
            Effect::Chime,
            Effect::Vibrate(ALARM_VIBRATION.to_vec()),
            Effect::Pulse {
                feature: Feature::Alarm,
                duration: self.effect_duration,
            },
        ]
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    /// The list as rendered: ordered by time of day, then id.
    pub fn sorted(&self) -> Vec<&Alarm> {
        let mut sorted: Vec<&Alarm> = self.alarms.iter().collect();
        sorted.sort_by_key(|alarm| (alarm.time, alarm.id));
        sorted
    }

    fn next_id(&self) -> AlarmId {
        let max = self.alarms.iter().map(|alarm| alarm.id.0).max().unwrap_or(0);
        AlarmId(max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn t(input: &str) -> NaiveTime {
        parse_time_of_day(input).unwrap()
    }

    fn manager(store: &MemoryStore) -> AlarmManager {
        AlarmManager::new(Arc::new(store.clone()), "alarms", Duration::from_secs(5))
    }

    #[test]
    fn added_alarms_survive_a_reload() {
        let store = MemoryStore::new();
        let mut first = manager(&store);
        first.add_alarm(t("07:00")).unwrap();
        first.add_alarm(t("22:30")).unwrap();

        let mut second = manager(&store);
        assert_eq!(second.load(), 2);
        let times: Vec<_> = second.alarms().iter().map(|a| (a.label(), a.active)).collect();
        assert_eq!(times, vec![("07:00".to_string(), true), ("22:30".to_string(), true)]);
    }

    #[test]
    fn stored_format_is_plain_json() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        alarms.add_alarm(t("07:00")).unwrap();

        let raw = store.get("alarms").unwrap().unwrap();
        assert_eq!(raw, r#"[{"id":1,"time":"07:00","active":true}]"#);
    }

    #[test]
    fn malformed_storage_loads_as_empty() {
        let store = MemoryStore::new();
        store.set("alarms", "{not json").unwrap();
        let mut alarms = manager(&store);
        assert_eq!(alarms.load(), 0);

        store.set("alarms", r#"[{"id":1,"time":"25:99","active":true}]"#).unwrap();
        assert_eq!(alarms.load(), 0);
    }

    #[test]
    fn check_fires_once_per_minute() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        let alarm = alarms.add_alarm(t("07:00")).unwrap();

        assert!(alarms.check_alarms(t("06:59")).is_empty());

        let fired = alarms.check_alarms(NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, alarm.id);
        assert!(!alarms.alarms()[0].active);

        assert!(alarms.check_alarms(NaiveTime::from_hms_opt(7, 0, 1).unwrap()).is_empty());
        assert!(alarms.check_alarms(NaiveTime::from_hms_opt(7, 0, 59).unwrap()).is_empty());

        // The deactivation is persisted.
        let mut reloaded = manager(&store);
        reloaded.load();
        assert!(!reloaded.alarms()[0].active);
    }

    #[test]
    fn delete_unknown_id_is_a_noop() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        let kept = alarms.add_alarm(t("07:00")).unwrap();
        assert!(!alarms.delete_alarm(AlarmId(99)).unwrap());
        assert!(alarms.delete_alarm(kept.id).unwrap());
        assert!(alarms.alarms().is_empty());
        assert_eq!(store.get("alarms").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn ids_stay_unique_after_reload_and_delete() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        let a = alarms.add_alarm(t("07:00")).unwrap();
        let b = alarms.add_alarm(t("08:00")).unwrap();
        alarms.delete_alarm(a.id).unwrap();

        let mut reloaded = manager(&store);
        reloaded.load();
        let c = reloaded.add_alarm(t("09:00")).unwrap();
        assert_ne!(c.id, b.id);
    }

    #[test]
    fn toggle_rearms_a_fired_alarm() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        let alarm = alarms.add_alarm(t("07:00")).unwrap();
        alarms.check_alarms(t("07:00"));
        assert_eq!(alarms.toggle_alarm(alarm.id).unwrap(), Some(true));
        assert_eq!(alarms.toggle_alarm(AlarmId(42)).unwrap(), None);
    }

    #[test]
    fn sorted_orders_by_time() {
        let store = MemoryStore::new();
        let mut alarms = manager(&store);
        alarms.add_alarm(t("22:00")).unwrap();
        alarms.add_alarm(t("06:15")).unwrap();
        let labels: Vec<_> = alarms.sorted().iter().map(|a| a.label()).collect();
        assert_eq!(labels, vec!["06:15", "22:00"]);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_time_of_day("7am").is_err());
        assert_eq!(t(" 07:05 "), NaiveTime::from_hms_opt(7, 5, 0).unwrap());
    }
}
