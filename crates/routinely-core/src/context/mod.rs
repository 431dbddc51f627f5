//! Context classification.
//!
//! Turns "now" into a [`RoutineContext`]: the time slot, the day category
//! and the saved location the device is at. Only the rules are stored;
//! a context is a snapshot recomputed whenever it is needed.

pub mod day_category;
pub mod location;
mod monitor;
pub mod time_slot;

pub use day_category::{DayCategory, DayCategorySettings, WEEKDAY_CATEGORY, WEEKEND_CATEGORY};
pub use location::{Coordinate, LocationKind, LocationSettings, SavedLocation};
pub use monitor::{LocationMonitor, LocationUpdate};
pub use time_slot::{TimeRange, TimeSlot, TimeSlotRange, TimeSlotSettings};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Label shown when the device is not inside any saved location.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Snapshot of "now" for routine selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineContext {
    pub time_slot: TimeSlot,
    pub day_category: String,
    pub day_category_name: String,
    /// Saved location id, `None` when unknown.
    pub location: Option<String>,
    pub location_name: Option<String>,
    pub at: DateTime<Utc>,
}

impl RoutineContext {
    pub fn location_label(&self) -> &str {
        self.location_name.as_deref().unwrap_or(UNKNOWN_LOCATION)
    }

    /// e.g. "Morning · Weekday · Home"
    pub fn describe(&self) -> String {
        format!(
            "{} · {} · {}",
            self.time_slot.display_name(),
            self.day_category_name,
            self.location_label()
        )
    }
}

/// Everything the classifier reads from settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(default)]
    pub time_slots: TimeSlotSettings,
    #[serde(default)]
    pub day_categories: DayCategorySettings,
    #[serde(default)]
    pub locations: LocationSettings,
}

/// Classifies instants against a set of [`ContextSettings`].
///
/// Constructed explicitly and passed to whatever needs it.
#[derive(Debug, Clone, Default)]
pub struct ContextClassifier {
    settings: ContextSettings,
}

impl ContextClassifier {
    pub fn new(settings: ContextSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ContextSettings {
        &mut self.settings
    }

    /// Classify a wall-clock instant. Time slot and weekday are read in the
    /// instant's own time zone.
    ///
    /// A missing coordinate only leaves the location unknown.
    pub fn classify<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        coordinate: Option<&Coordinate>,
    ) -> RoutineContext {
        let local = now.naive_local();
        let time_slot = self
            .settings
            .time_slots
            .slot_for(time_slot::minute_of_day(&local.time()));
        let day = self.settings.day_categories.category_for(local.weekday());
        let location = coordinate.and_then(|c| self.settings.locations.location_for(c));

        let context = RoutineContext {
            time_slot,
            day_category: day.id,
            day_category_name: day.name,
            location: location.map(|l| l.id.clone()),
            location_name: location.map(|l| l.name.clone()),
            at: now.with_timezone(&Utc),
        };
        tracing::debug!(context = %context.describe(), "classified context");
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn classifier_with_home() -> (ContextClassifier, Coordinate) {
        let home = Coordinate::new(48.8566, 2.3522).unwrap();
        let mut settings = ContextSettings::default();
        settings
            .locations
            .add(SavedLocation::new("Home", LocationKind::Home, home))
            .unwrap();
        (ContextClassifier::new(settings), home)
    }

    #[test]
    fn classifies_weekday_morning_at_home() {
        let (classifier, home) = classifier_with_home();
        // 2024-03-04 is a Monday
        let ctx = classifier.classify(&at(2024, 3, 4, 7, 45), Some(&home));
        assert_eq!(ctx.time_slot, TimeSlot::Morning);
        assert_eq!(ctx.day_category, WEEKDAY_CATEGORY);
        assert_eq!(ctx.location.as_deref(), Some("home"));
        assert_eq!(ctx.describe(), "Morning · Weekday · Home");
    }

    #[test]
    fn uses_local_time_not_utc() {
        let (classifier, _) = classifier_with_home();
        // 06:30 at +02:00 is 04:30 UTC, which would be night
        let ctx = classifier.classify(&at(2024, 3, 4, 6, 30), None);
        assert_eq!(ctx.time_slot, TimeSlot::EarlyMorning);
        assert_eq!(ctx.at, at(2024, 3, 4, 6, 30).with_timezone(&Utc));
    }

    #[test]
    fn missing_location_is_unknown_but_time_still_classified() {
        let (classifier, _) = classifier_with_home();
        // Saturday night
        let ctx = classifier.classify(&at(2024, 3, 9, 23, 30), None);
        assert_eq!(ctx.time_slot, TimeSlot::Night);
        assert_eq!(ctx.day_category, WEEKEND_CATEGORY);
        assert!(ctx.location.is_none());
        assert_eq!(ctx.location_label(), UNKNOWN_LOCATION);
    }

    #[test]
    fn far_away_coordinate_is_unknown() {
        let (classifier, _) = classifier_with_home();
        let elsewhere = Coordinate::new(51.5074, -0.1278).unwrap();
        let ctx = classifier.classify(&at(2024, 3, 4, 12, 0), Some(&elsewhere));
        assert!(ctx.location.is_none());
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let (classifier, _) = classifier_with_home();
        let text = toml::to_string_pretty(classifier.settings()).unwrap();
        let back: ContextSettings = toml::from_str(&text).unwrap();
        assert_eq!(&back, classifier.settings());
    }
}
