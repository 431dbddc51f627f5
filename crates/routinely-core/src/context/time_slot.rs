//! Time-of-day slots.
//!
//! Ranges are half-open `[start, end)` in minutes since midnight. A range
//! whose start is after its end wraps past midnight.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    EarlyMorning,
    Morning,
    LateMorning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 6] = [
        TimeSlot::EarlyMorning,
        TimeSlot::Morning,
        TimeSlot::LateMorning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            TimeSlot::EarlyMorning => "Early Morning",
            TimeSlot::Morning => "Morning",
            TimeSlot::LateMorning => "Late Morning",
            TimeSlot::Afternoon => "Afternoon",
            TimeSlot::Evening => "Evening",
            TimeSlot::Night => "Night",
        }
    }

    pub fn default_range(&self) -> TimeRange {
        let (start, end) = match self {
            TimeSlot::EarlyMorning => (5, 7),
            TimeSlot::Morning => (7, 9),
            TimeSlot::LateMorning => (9, 11),
            TimeSlot::Afternoon => (11, 17),
            TimeSlot::Evening => (17, 21),
            TimeSlot::Night => (21, 5),
        };
        TimeRange {
            start_minute: start * 60,
            end_minute: end * 60,
        }
    }

    /// Slot from the built-in ranges, which cover the whole day.
    pub fn default_for(minute_of_day: u16) -> TimeSlot {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.default_range().contains(minute_of_day))
            .unwrap_or(TimeSlot::Night)
    }
}

impl std::str::FromStr for TimeSlot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "early_morning" => Ok(TimeSlot::EarlyMorning),
            "morning" => Ok(TimeSlot::Morning),
            "late_morning" => Ok(TimeSlot::LateMorning),
            "afternoon" => Ok(TimeSlot::Afternoon),
            "evening" => Ok(TimeSlot::Evening),
            "night" => Ok(TimeSlot::Night),
            other => Err(ValidationError::UnknownId {
                kind: "time slot".into(),
                id: other.to_string(),
            }),
        }
    }
}

/// `[start, end)` minute-of-day range, stored as `"HH:MM"` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange", into = "RawTimeRange")]
pub struct TimeRange {
    start_minute: u16,
    end_minute: u16,
}

impl TimeRange {
    /// # Errors
    /// Returns an error if either bound is not below 1440.
    pub fn new(start_minute: u16, end_minute: u16) -> Result<Self, ValidationError> {
        for (field, value) in [("start", start_minute), ("end", end_minute)] {
            if value >= MINUTES_PER_DAY {
                return Err(ValidationError::invalid(
                    field,
                    format!("{value} is not a minute of the day"),
                ));
            }
        }
        Ok(Self {
            start_minute,
            end_minute,
        })
    }

    /// # Errors
    /// Returns an error unless both bounds are `HH:MM` times.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_hhmm("start", start)?, parse_hhmm("end", end)?)
    }

    pub fn start_minute(&self) -> u16 {
        self.start_minute
    }

    pub fn end_minute(&self) -> u16 {
        self.end_minute
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start_minute > self.end_minute
    }

    pub fn contains(&self, minute_of_day: u16) -> bool {
        if self.wraps_midnight() {
            minute_of_day >= self.start_minute || minute_of_day < self.end_minute
        } else {
            minute_of_day >= self.start_minute && minute_of_day < self.end_minute
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawTimeRange {
    start: String,
    end: String,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = ValidationError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::parse(&raw.start, &raw.end)
    }
}

impl From<TimeRange> for RawTimeRange {
    fn from(range: TimeRange) -> Self {
        RawTimeRange {
            start: format_hhmm(range.start_minute),
            end: format_hhmm(range.end_minute),
        }
    }
}

fn parse_hhmm(field: &str, value: &str) -> Result<u16, ValidationError> {
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ValidationError::invalid(field, format!("'{value}': {e}")))?;
    Ok(minute_of_day(&time))
}

fn format_hhmm(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

pub fn minute_of_day(time: &impl Timelike) -> u16 {
    (time.hour() * 60 + time.minute()) as u16
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotRange {
    pub slot: TimeSlot,
    pub range: TimeRange,
}

/// User-editable, ordered time-slot ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotSettings {
    #[serde(default = "default_ranges")]
    pub ranges: Vec<TimeSlotRange>,
}

fn default_ranges() -> Vec<TimeSlotRange> {
    TimeSlot::ALL
        .into_iter()
        .map(|slot| TimeSlotRange {
            slot,
            range: slot.default_range(),
        })
        .collect()
}

impl Default for TimeSlotSettings {
    fn default() -> Self {
        Self {
            ranges: default_ranges(),
        }
    }
}

impl TimeSlotSettings {
    /// First configured range containing the minute, else the built-in slot.
    pub fn slot_for(&self, minute_of_day: u16) -> TimeSlot {
        self.ranges
            .iter()
            .find(|r| r.range.contains(minute_of_day))
            .map(|r| r.slot)
            .unwrap_or_else(|| TimeSlot::default_for(minute_of_day))
    }

    pub fn range_for(&self, slot: TimeSlot) -> TimeRange {
        self.ranges
            .iter()
            .find(|r| r.slot == slot)
            .map(|r| r.range)
            .unwrap_or_else(|| slot.default_range())
    }

    /// Replace the range for `slot`, keeping its position in the list.
    pub fn set_range(&mut self, slot: TimeSlot, range: TimeRange) {
        match self.ranges.iter_mut().find(|r| r.slot == slot) {
            Some(existing) => existing.range = range,
            None => self.ranges.push(TimeSlotRange { slot, range }),
        }
    }

    pub fn reset(&mut self) {
        self.ranges = default_ranges();
    }
}
