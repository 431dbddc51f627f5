//! Habit types.
//!
//! A habit is one trackable action inside a routine. Its behaviour is
//! described by [`HabitType`], a closed sum type; every consumer matches
//! it exhaustively so adding a variant forces each site to be revisited.

mod conditional;

pub use conditional::{ConditionalHabitInfo, ConditionalOption, ConditionalResponse, MAX_OPTIONS};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A checklist entry inside a task habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_optional: bool,
}

impl Subtask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            is_optional: false,
        }
    }
}

/// How a timer habit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStyle {
    /// Count down from `duration_secs`.
    Down,
    /// Count up with `duration_secs` as the goal.
    Up,
    /// Run through `steps` one after another.
    MultiStep,
}

/// One segment of a multi-step timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStep {
    pub name: String,
    pub duration_secs: u64,
}

/// One step of a guided sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub id: String,
    pub name: String,
    pub duration_secs: u64,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl SequenceStep {
    pub fn new(name: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            duration_secs,
            instructions: None,
        }
    }
}

/// What kind of habit this is, with its per-kind payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HabitType {
    /// Checkbox task, optionally with subtasks.
    Task {
        #[serde(default)]
        subtasks: Vec<Subtask>,
    },
    Timer {
        style: TimerStyle,
        #[serde(default)]
        duration_secs: u64,
        #[serde(default)]
        steps: Vec<TimerStep>,
    },
    /// Count through a list of items (e.g. supplements).
    Counter {
        #[serde(default)]
        items: Vec<String>,
    },
    AppLaunch {
        url_scheme: String,
        app_name: String,
        #[serde(default = "default_launch_secs")]
        duration_secs: u64,
    },
    Website {
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default = "default_launch_secs")]
        duration_secs: u64,
    },
    /// Record a numeric value (weight, water, mood...).
    Measurement {
        unit: String,
        #[serde(default)]
        target_value: Option<f64>,
    },
    GuidedSequence {
        steps: Vec<SequenceStep>,
    },
    /// Ask a question and branch into another habit sequence.
    Conditional(ConditionalHabitInfo),
}

fn default_launch_secs() -> u64 {
    300
}

/// How a client drives a habit while it is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interaction {
    CheckOff,
    RunTimer,
    Count,
    OpenUrl,
    RecordValue,
    StepThrough,
    AskQuestion,
}

impl HabitType {
    /// Rough time the habit takes, used for routine duration estimates.
    ///
    /// Conditional habits count as zero: the habits of the chosen path are
    /// counted once they are spliced into the session.
    pub fn estimated_duration_secs(&self) -> u64 {
        match self {
            HabitType::Task { subtasks } => (subtasks.len() as u64 * 60).max(60),
            HabitType::Timer {
                style,
                duration_secs,
                steps,
            } => match style {
                TimerStyle::MultiStep => steps.iter().map(|s| s.duration_secs).sum(),
                TimerStyle::Down | TimerStyle::Up => *duration_secs,
            },
            HabitType::Counter { items } => (items.len() as u64 * 30).max(60),
            HabitType::AppLaunch { duration_secs, .. } => *duration_secs,
            HabitType::Website { duration_secs, .. } => *duration_secs,
            HabitType::Measurement { .. } => 30,
            HabitType::GuidedSequence { steps } => steps.iter().map(|s| s.duration_secs).sum(),
            HabitType::Conditional(_) => 0,
        }
    }

    /// Symbolic icon identifier for the habit kind.
    pub fn icon_name(&self) -> &'static str {
        match self {
            HabitType::Task { .. } => "checkmark.square",
            HabitType::Timer { style, .. } => match style {
                TimerStyle::Down => "timer",
                TimerStyle::Up => "stopwatch",
                TimerStyle::MultiStep => "list.bullet.clipboard",
            },
            HabitType::Counter { .. } => "number.circle",
            HabitType::AppLaunch { .. } => "app.badge",
            HabitType::Website { .. } => "safari",
            HabitType::Measurement { .. } => "ruler",
            HabitType::GuidedSequence { .. } => "list.number",
            HabitType::Conditional(_) => "questionmark.circle",
        }
    }

    pub fn interaction(&self) -> Interaction {
        match self {
            HabitType::Task { .. } => Interaction::CheckOff,
            HabitType::Timer { .. } => Interaction::RunTimer,
            HabitType::Counter { .. } => Interaction::Count,
            HabitType::AppLaunch { .. } | HabitType::Website { .. } => Interaction::OpenUrl,
            HabitType::Measurement { .. } => Interaction::RecordValue,
            HabitType::GuidedSequence { .. } => Interaction::StepThrough,
            HabitType::Conditional(_) => Interaction::AskQuestion,
        }
    }

    /// Target opened by launch-style habits.
    pub fn launch_target(&self) -> Option<&str> {
        match self {
            HabitType::AppLaunch { url_scheme, .. } => Some(url_scheme),
            HabitType::Website { url, .. } => Some(url),
            HabitType::Task { .. }
            | HabitType::Timer { .. }
            | HabitType::Counter { .. }
            | HabitType::Measurement { .. }
            | HabitType::GuidedSequence { .. }
            | HabitType::Conditional(_) => None,
        }
    }

    /// Habits that need the phone itself (apps, browser).
    pub fn requires_device(&self) -> bool {
        matches!(self, HabitType::AppLaunch { .. } | HabitType::Website { .. })
    }

    pub fn as_conditional(&self) -> Option<&ConditionalHabitInfo> {
        match self {
            HabitType::Conditional(info) => Some(info),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            HabitType::Task { subtasks } => {
                if subtasks.iter().any(|s| s.name.trim().is_empty()) {
                    return Err(ValidationError::invalid("subtasks", "subtask name is empty"));
                }
            }
            HabitType::Timer {
                style,
                duration_secs,
                steps,
            } => match style {
                TimerStyle::MultiStep if steps.is_empty() => {
                    return Err(ValidationError::EmptyCollection("timer steps".into()));
                }
                TimerStyle::Down if *duration_secs == 0 => {
                    return Err(ValidationError::invalid(
                        "duration_secs",
                        "countdown timer needs a duration",
                    ));
                }
                _ => {}
            },
            HabitType::Counter { .. } => {}
            HabitType::AppLaunch { url_scheme, .. } => {
                if url_scheme.trim().is_empty() || url_scheme.contains(char::is_whitespace) {
                    return Err(ValidationError::invalid("url_scheme", "invalid app url scheme"));
                }
            }
            HabitType::Website { url, .. } => {
                let parsed = url::Url::parse(url)
                    .map_err(|e| ValidationError::invalid("url", e.to_string()))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ValidationError::invalid(
                        "url",
                        format!("unsupported scheme '{}'", parsed.scheme()),
                    ));
                }
            }
            HabitType::Measurement { unit, .. } => {
                if unit.trim().is_empty() {
                    return Err(ValidationError::invalid("unit", "must not be empty"));
                }
            }
            HabitType::GuidedSequence { steps } => {
                if steps.is_empty() {
                    return Err(ValidationError::EmptyCollection("sequence steps".into()));
                }
            }
            HabitType::Conditional(info) => info.validate()?,
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

/// A single trackable action within a routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub habit_type: HabitType,
    /// Position within the owning list. Maintained by the template or
    /// session that owns the habit.
    #[serde(default)]
    pub order: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_optional: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Habit {
    pub fn new(name: impl Into<String>, habit_type: HabitType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            habit_type,
            order: 0,
            is_active: true,
            is_optional: false,
            created_at: Utc::now(),
            notes: None,
            color: None,
        }
    }

    /// Plain checkbox habit.
    pub fn task(name: impl Into<String>) -> Self {
        Self::new(name, HabitType::Task { subtasks: Vec::new() })
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.habit_type, HabitType::Conditional(_))
    }

    pub fn estimated_duration_secs(&self) -> u64 {
        self.habit_type.estimated_duration_secs()
    }

    /// Check the user-authored fields.
    ///
    /// # Errors
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        self.habit_type.validate()
    }
}

/// Rewrite `order` so active habits run 0, 1, 2... in list order.
/// Inactive habits are numbered after the last active one.
pub fn renumber(habits: &mut [Habit]) {
    let mut next = 0u32;
    for habit in habits.iter_mut().filter(|h| h.is_active) {
        habit.order = next;
        next += 1;
    }
    for habit in habits.iter_mut().filter(|h| !h.is_active) {
        habit.order = next;
        next += 1;
    }
}
