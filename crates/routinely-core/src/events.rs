use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::ConditionalResponse;

/// Every session state change produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        routine_id: String,
        routine_name: String,
        habit_count: usize,
        at: DateTime<Utc>,
    },
    HabitCompleted {
        habit_id: String,
        habit_name: String,
        duration_secs: Option<u64>,
        at: DateTime<Utc>,
    },
    HabitSkipped {
        habit_id: String,
        habit_name: String,
        reason: Option<String>,
        at: DateTime<Utc>,
    },
    /// Cursor stepped back and the habit's record was dropped.
    HabitUndone {
        habit_id: String,
        habit_name: String,
        at: DateTime<Utc>,
    },
    CursorMoved {
        from_index: usize,
        to_index: usize,
        at: DateTime<Utc>,
    },
    BranchChosen {
        response: ConditionalResponse,
        injected_count: usize,
        at: DateTime<Utc>,
    },
    /// An ad-hoc change to this session's habit list.
    SessionModified {
        modification: String,
        habit_count: usize,
        at: DateTime<Utc>,
    },
    /// Records arrived from the companion device.
    CompletionsMerged {
        added: usize,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        completed_count: usize,
        skipped_count: usize,
        total_duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session_id: String,
        routine_id: String,
        routine_name: String,
        current_index: usize,
        habit_count: usize,
        current_habit_id: Option<String>,
        current_habit_name: Option<String>,
        progress_pct: f64,
        completed: bool,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "SessionStarted",
            Event::HabitCompleted { .. } => "HabitCompleted",
            Event::HabitSkipped { .. } => "HabitSkipped",
            Event::HabitUndone { .. } => "HabitUndone",
            Event::CursorMoved { .. } => "CursorMoved",
            Event::BranchChosen { .. } => "BranchChosen",
            Event::SessionModified { .. } => "SessionModified",
            Event::CompletionsMerged { .. } => "CompletionsMerged",
            Event::SessionCompleted { .. } => "SessionCompleted",
            Event::SessionCancelled { .. } => "SessionCancelled",
            Event::StateSnapshot { .. } => "StateSnapshot",
        }
    }
}
