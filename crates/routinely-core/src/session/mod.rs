//! Routine session engine.
//!
//! A [`RoutineSession`] drives one run of a template:
//!
//! ```text
//! NotStarted -> Running -> Completed
//! ```
//!
//! Cancelling is simply dropping the session. All engine operations are
//! silent no-ops when their preconditions do not hold (finished session,
//! no current habit, index out of range, unknown option); lifecycle errors
//! live in [`SessionController`].

mod controller;
mod replay;

pub use controller::SessionController;
pub use replay::{apply_modifications, ModificationKind, SessionModification};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::Event;
use crate::habit::{renumber, ConditionalResponse, Habit};
use crate::template::RoutineTemplate;

/// One completed or skipped habit. Append-only; undo removes the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
    pub habit_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default)]
    pub is_skipped: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Totals for a finished (or abandoned) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub routine_id: String,
    pub routine_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub habit_count: usize,
    pub completed_count: usize,
    pub skipped_count: usize,
    pub total_duration_secs: u64,
    /// Wall time from start to completion (or to now).
    pub elapsed_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineSession {
    pub id: String,
    template: RoutineTemplate,
    pub started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    current_index: usize,
    completions: Vec<HabitCompletion>,
    modifications: Vec<SessionModification>,
}

impl RoutineSession {
    /// Start a session over a snapshot of `template`.
    pub fn new(template: RoutineTemplate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            template,
            started_at: Utc::now(),
            completed_at: None,
            current_index: 0,
            completions: Vec::new(),
            modifications: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn template(&self) -> &RoutineTemplate {
        &self.template
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn completions(&self) -> &[HabitCompletion] {
        &self.completions
    }

    pub fn modifications(&self) -> &[SessionModification] {
        &self.modifications
    }

    /// Template habits with every modification replayed. Recomputed on
    /// each call.
    pub fn effective_habits(&self) -> Vec<Habit> {
        apply_modifications(&self.template.active_habits(), &self.modifications)
    }

    pub fn current_habit(&self) -> Option<Habit> {
        if self.is_completed() {
            return None;
        }
        self.effective_habits().into_iter().nth(self.current_index)
    }

    /// Most recent record for `habit_id`.
    pub fn completion_for(&self, habit_id: &str) -> Option<&HabitCompletion> {
        self.completions.iter().rev().find(|c| c.habit_id == habit_id)
    }

    /// 0.0 ..= 1.0, share of effective habits with a record.
    pub fn progress(&self) -> f64 {
        let habits = self.effective_habits();
        if habits.is_empty() {
            return if self.is_completed() { 1.0 } else { 0.0 };
        }
        let done = habits
            .iter()
            .filter(|h| self.completion_for(&h.id).is_some())
            .count();
        done as f64 / habits.len() as f64
    }

    pub fn summary(&self) -> SessionSummary {
        let skipped = self.completions.iter().filter(|c| c.is_skipped).count();
        SessionSummary {
            session_id: self.id.clone(),
            routine_id: self.template.id.clone(),
            routine_name: self.template.name.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            habit_count: self.effective_habits().len(),
            completed_count: self.completions.len() - skipped,
            skipped_count: skipped,
            total_duration_secs: self.completions.iter().filter_map(|c| c.duration_secs).sum(),
            elapsed_secs: (self.completed_at.unwrap_or_else(Utc::now) - self.started_at)
                .num_seconds()
                .max(0) as u64,
        }
    }

    /// Full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let habits = self.effective_habits();
        let current = if self.is_completed() {
            None
        } else {
            habits.get(self.current_index)
        };
        Event::StateSnapshot {
            session_id: self.id.clone(),
            routine_id: self.template.id.clone(),
            routine_name: self.template.name.clone(),
            current_index: self.current_index,
            habit_count: habits.len(),
            current_habit_id: current.map(|h| h.id.clone()),
            current_habit_name: current.map(|h| h.name.clone()),
            progress_pct: self.progress() * 100.0,
            completed: self.is_completed(),
            at: Utc::now(),
        }
    }

    // ── Progress ─────────────────────────────────────────────────────

    /// Record the current habit as done and move on.
    ///
    /// A habit that already has a record (possible after a branch moved it)
    /// only advances the cursor.
    pub fn complete_current_habit(&mut self, duration_secs: Option<u64>, notes: Option<String>) {
        self.record_current(duration_secs, notes, false);
    }

    /// Record the current habit as skipped and move on.
    pub fn skip_current_habit(&mut self, reason: Option<String>) {
        self.record_current(Some(0), reason, true);
    }

    fn record_current(
        &mut self,
        duration_secs: Option<u64>,
        notes: Option<String>,
        is_skipped: bool,
    ) {
        if self.is_completed() {
            return;
        }
        let habits = self.effective_habits();
        let Some(habit) = habits.get(self.current_index) else {
            return;
        };
        if self.completion_for(&habit.id).is_none() {
            self.completions.push(HabitCompletion {
                habit_id: habit.id.clone(),
                completed_at: Utc::now(),
                duration_secs,
                is_skipped,
                notes,
            });
        }
        self.advance(habits.len());
    }

    fn advance(&mut self, len: usize) {
        if self.current_index + 1 >= len {
            self.current_index = len;
            self.finish();
        } else {
            self.current_index += 1;
        }
    }

    fn finish(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
            tracing::info!(session = %self.id, routine = %self.template.name, "routine completed");
        }
    }

    /// Step back one habit and drop its record.
    pub fn go_to_previous_habit(&mut self) {
        if self.is_completed() || self.current_index == 0 {
            return;
        }
        self.current_index -= 1;
        if let Some(habit) = self.effective_habits().get(self.current_index) {
            if let Some(pos) = self.completions.iter().rposition(|c| c.habit_id == habit.id) {
                self.completions.remove(pos);
            }
        }
    }

    /// Jump to `index`. Records are left alone.
    pub fn go_to_habit(&mut self, index: usize) {
        if self.is_completed() || index >= self.effective_habits().len() {
            return;
        }
        self.current_index = index;
    }

    // ── Modifications ────────────────────────────────────────────────

    pub fn add_habit(&mut self, habit: Habit, index: Option<usize>) {
        if self.is_completed() {
            return;
        }
        self.push_modification(ModificationKind::Added { habit, index });
    }

    pub fn remove_habit(&mut self, habit_id: &str) {
        if self.is_completed() || !self.effective_habits().iter().any(|h| h.id == habit_id) {
            return;
        }
        self.push_modification(ModificationKind::Removed {
            habit_id: habit_id.to_string(),
        });
    }

    /// Replace a habit's fields for this session only.
    pub fn update_habit(&mut self, habit: Habit) {
        if self.is_completed() || !self.effective_habits().iter().any(|h| h.id == habit.id) {
            return;
        }
        self.push_modification(ModificationKind::Modified { habit });
    }

    pub fn reorder_habits(&mut self, from: usize, to: usize) {
        if self.is_completed() {
            return;
        }
        let mut habits = self.effective_habits();
        if from >= habits.len() || to >= habits.len() || from == to {
            return;
        }
        let habit = habits.remove(from);
        habits.insert(to, habit);
        renumber(&mut habits);
        self.push_modification(ModificationKind::Reordered { habits });
    }

    /// Append a modification and keep the cursor on the same habit.
    fn push_modification(&mut self, kind: ModificationKind) {
        let current_id = self.current_habit().map(|h| h.id);
        self.modifications.push(SessionModification::new(kind));
        let habits = self.effective_habits();
        let clamped = self.current_index.min(habits.len());
        self.current_index = current_id
            .and_then(|id| habits.iter().position(|h| h.id == id))
            .unwrap_or(clamped);
        if self.current_index >= habits.len() {
            self.finish();
        }
    }

    // ── Branching ────────────────────────────────────────────────────

    /// Answer the current conditional habit with `option_id`.
    ///
    /// The option's habits are spliced in right after the conditional
    /// habit, the conditional habit is recorded with the chosen answer, and
    /// the cursor lands on the first spliced habit (or the next original
    /// one when the path is empty). Habits from the path that also appear
    /// later in the list are moved forward rather than duplicated.
    /// Answering again drops whatever path the previous answer spliced in.
    pub fn complete_conditional_habit(&mut self, option_id: &str) -> Option<ConditionalResponse> {
        if self.is_completed() {
            return None;
        }
        let habits = self.effective_habits();
        let index = self.current_index;
        let habit = habits.get(index)?;
        let info = habit.habit_type.as_conditional()?;
        let option = info.option(option_id)?;

        let injected: Vec<Habit> = option.habits.clone();
        // Paths of the other options, left behind by an earlier answer.
        let base = self.template.active_habits();
        let stale: Vec<&str> = info
            .options()
            .iter()
            .filter(|o| o.id != option.id)
            .flat_map(|o| o.habits.iter())
            .filter(|h| !injected.iter().any(|i| i.id == h.id))
            .filter(|h| !base.iter().any(|b| b.id == h.id))
            .map(|h| h.id.as_str())
            .collect();

        let mut reordered: Vec<Habit> = habits[..=index].to_vec();
        reordered.extend(injected.iter().cloned());
        reordered.extend(
            habits[index + 1..]
                .iter()
                .filter(|h| !injected.iter().any(|i| i.id == h.id))
                .filter(|h| !stale.contains(&h.id.as_str()))
                .cloned(),
        );
        self.completions.retain(|c| !stale.contains(&c.habit_id.as_str()));
        renumber(&mut reordered);
        let len = reordered.len();
        self.modifications
            .push(SessionModification::new(ModificationKind::Reordered { habits: reordered }));

        let note = format!("Selected: {}", option.text);
        match self.completions.iter_mut().find(|c| c.habit_id == habit.id) {
            Some(record) => record.notes = Some(note),
            None => self.completions.push(HabitCompletion {
                habit_id: habit.id.clone(),
                completed_at: Utc::now(),
                duration_secs: None,
                is_skipped: false,
                notes: Some(note),
            }),
        }

        self.current_index = index + 1;
        if self.current_index >= len {
            self.current_index = len;
            self.finish();
        }

        tracing::debug!(
            session = %self.id,
            habit = %habit.name,
            option = %option.text,
            injected = injected.len(),
            "conditional branch chosen"
        );

        Some(ConditionalResponse {
            id: Uuid::new_v4().to_string(),
            habit_id: habit.id.clone(),
            question: info.question.clone(),
            option_id: option.id.clone(),
            option_text: option.text.clone(),
            routine_id: Some(self.template.id.clone()),
            session_id: Some(self.id.clone()),
            answered_at: Utc::now(),
        })
    }

    // ── Companion ────────────────────────────────────────────────────

    /// Merge completions recorded elsewhere (e.g. on the watch).
    ///
    /// Records for habits not in the session, or already recorded, are
    /// ignored. The cursor moves past any leading run of recorded habits.
    /// Returns how many records were added.
    pub fn merge_completions(&mut self, incoming: &[HabitCompletion]) -> usize {
        if self.is_completed() {
            return 0;
        }
        let habits = self.effective_habits();
        let mut added = 0;
        for completion in incoming {
            let known = habits.iter().any(|h| h.id == completion.habit_id);
            if known && self.completion_for(&completion.habit_id).is_none() {
                self.completions.push(completion.clone());
                added += 1;
            }
        }
        while self.current_index < habits.len()
            && self.completion_for(&habits[self.current_index].id).is_some()
        {
            self.current_index += 1;
        }
        if self.current_index >= habits.len() {
            self.finish();
        }
        added
    }
}
