//! Lifecycle wrapper around [`RoutineSession`].
//!
//! The engine itself never errors; the controller turns "no session" and
//! "already running" into [`RoutineStateError`]s and reports every
//! transition as [`Event`]s.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{HabitCompletion, RoutineSession};
use crate::error::{CoreError, RoutineStateError};
use crate::events::Event;
use crate::habit::Habit;
use crate::template::RoutineTemplate;

/// Holds at most one session. Serializable so callers can persist it
/// between process runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionController {
    #[serde(default)]
    active: Option<RoutineSession>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&RoutineSession> {
        self.active.as_ref()
    }

    /// A session exists and has not finished.
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|s| !s.is_completed())
    }

    pub fn snapshot(&self) -> Result<Event, CoreError> {
        self.active
            .as_ref()
            .map(RoutineSession::snapshot)
            .ok_or_else(|| RoutineStateError::NoActiveSession.into())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session. A finished session still held is replaced.
    pub fn start(&mut self, template: RoutineTemplate) -> Result<Event, CoreError> {
        if let Some(session) = self.active.as_ref().filter(|s| !s.is_completed()) {
            return Err(RoutineStateError::SessionAlreadyActive {
                session_id: session.id.clone(),
            }
            .into());
        }
        template.validate()?;

        let session = RoutineSession::new(template);
        tracing::info!(
            session = %session.id,
            routine = %session.template().name,
            "routine started"
        );
        let event = Event::SessionStarted {
            session_id: session.id.clone(),
            routine_id: session.template().id.clone(),
            routine_name: session.template().name.clone(),
            habit_count: session.effective_habits().len(),
            at: session.started_at,
        };
        self.active = Some(session);
        Ok(event)
    }

    pub fn complete(
        &mut self,
        duration_secs: Option<u64>,
        notes: Option<String>,
    ) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let before = session.current_habit();
        let recorded = session.completions().len();
        session.complete_current_habit(duration_secs, notes);

        let mut events = Vec::new();
        if let Some(habit) = before {
            if session.completions().len() > recorded {
                events.push(Event::HabitCompleted {
                    habit_id: habit.id,
                    habit_name: habit.name,
                    duration_secs,
                    at: Utc::now(),
                });
            }
        }
        push_completion(session, &mut events);
        Ok(events)
    }

    pub fn skip(&mut self, reason: Option<String>) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let before = session.current_habit();
        let recorded = session.completions().len();
        session.skip_current_habit(reason.clone());

        let mut events = Vec::new();
        if let Some(habit) = before {
            if session.completions().len() > recorded {
                events.push(Event::HabitSkipped {
                    habit_id: habit.id,
                    habit_name: habit.name,
                    reason,
                    at: Utc::now(),
                });
            }
        }
        push_completion(session, &mut events);
        Ok(events)
    }

    /// Step back one habit, dropping its record.
    pub fn undo(&mut self) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let from = session.current_index();
        let recorded = session.completions().len();
        session.go_to_previous_habit();

        let mut events = Vec::new();
        if session.current_index() != from {
            events.push(Event::CursorMoved {
                from_index: from,
                to_index: session.current_index(),
                at: Utc::now(),
            });
            if session.completions().len() < recorded {
                if let Some(habit) = session.current_habit() {
                    events.push(Event::HabitUndone {
                        habit_id: habit.id,
                        habit_name: habit.name,
                        at: Utc::now(),
                    });
                }
            }
        }
        Ok(events)
    }

    pub fn go_to(&mut self, index: usize) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let from = session.current_index();
        session.go_to_habit(index);
        let to = session.current_index();
        Ok(if from == to {
            Vec::new()
        } else {
            vec![Event::CursorMoved {
                from_index: from,
                to_index: to,
                at: Utc::now(),
            }]
        })
    }

    /// Answer the current conditional habit.
    pub fn choose(&mut self, option_id: &str) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let before = session.effective_habits().len();
        let mut events = Vec::new();
        if let Some(response) = session.complete_conditional_habit(option_id) {
            let injected_count = session.effective_habits().len().saturating_sub(before);
            events.push(Event::BranchChosen {
                response,
                injected_count,
                at: Utc::now(),
            });
        }
        push_completion(session, &mut events);
        Ok(events)
    }

    pub fn add_habit(
        &mut self,
        habit: Habit,
        index: Option<usize>,
    ) -> Result<Vec<Event>, CoreError> {
        habit.validate()?;
        self.modify(|s| s.add_habit(habit, index))
    }

    pub fn remove_habit(&mut self, habit_id: &str) -> Result<Vec<Event>, CoreError> {
        self.modify(|s| s.remove_habit(habit_id))
    }

    pub fn update_habit(&mut self, habit: Habit) -> Result<Vec<Event>, CoreError> {
        habit.validate()?;
        self.modify(|s| s.update_habit(habit))
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<Vec<Event>, CoreError> {
        self.modify(|s| s.reorder_habits(from, to))
    }

    /// Fold in records from the companion device.
    pub fn merge(&mut self, incoming: &[HabitCompletion]) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let added = session.merge_completions(incoming);
        let mut events = Vec::new();
        if added > 0 {
            events.push(Event::CompletionsMerged {
                added,
                at: Utc::now(),
            });
        }
        push_completion(session, &mut events);
        Ok(events)
    }

    /// Drop the running session.
    pub fn cancel(&mut self) -> Result<Event, CoreError> {
        let session = self
            .active
            .take()
            .ok_or(RoutineStateError::NoActiveSession)?;
        tracing::info!(session = %session.id, "routine cancelled");
        Ok(Event::SessionCancelled {
            session_id: session.id,
            at: Utc::now(),
        })
    }

    /// Hand over a finished session, leaving the controller empty.
    pub fn take_finished(&mut self) -> Option<RoutineSession> {
        if self.active.as_ref().is_some_and(RoutineSession::is_completed) {
            self.active.take()
        } else {
            None
        }
    }

    fn running(&mut self) -> Result<&mut RoutineSession, CoreError> {
        match self.active.as_mut() {
            None => Err(RoutineStateError::NoActiveSession.into()),
            Some(session) if session.is_completed() => Err(RoutineStateError::SessionCompleted {
                session_id: session.id.clone(),
            }
            .into()),
            Some(session) => Ok(session),
        }
    }

    fn modify(&mut self, apply: impl FnOnce(&mut RoutineSession)) -> Result<Vec<Event>, CoreError> {
        let session = self.running()?;
        let logged = session.modifications().len();
        apply(session);

        let mut events = Vec::new();
        if let Some(last) = session.modifications().get(logged) {
            events.push(Event::SessionModified {
                modification: last.kind.name().to_string(),
                habit_count: session.effective_habits().len(),
                at: last.at,
            });
        }
        push_completion(session, &mut events);
        Ok(events)
    }
}

fn push_completion(session: &RoutineSession, events: &mut Vec<Event>) {
    if let Some(at) = session.completed_at() {
        let summary = session.summary();
        events.push(Event::SessionCompleted {
            session_id: summary.session_id,
            completed_count: summary.completed_count,
            skipped_count: summary.skipped_count,
            total_duration_secs: summary.total_duration_secs,
            at,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::habit::{ConditionalHabitInfo, ConditionalOption, HabitType};

    fn template(names: &[&str]) -> RoutineTemplate {
        RoutineTemplate::new("Evening", names.iter().map(|n| Habit::task(*n)).collect())
    }

    fn names(events: &[Event]) -> Vec<&'static str> {
        events.iter().map(Event::name).collect()
    }

    #[test]
    fn operations_without_session_fail() {
        let mut c = SessionController::new();
        assert!(matches!(
            c.complete(None, None),
            Err(CoreError::RoutineState(RoutineStateError::NoActiveSession))
        ));
        assert!(c.cancel().is_err());
        assert!(c.snapshot().is_err());
        assert!(c.take_finished().is_none());
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let mut c = SessionController::new();
        c.start(template(&["a"])).unwrap();
        let err = c.start(template(&["b"])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::RoutineState(RoutineStateError::SessionAlreadyActive { .. })
        ));
    }

    #[test]
    fn empty_template_cannot_start() {
        let mut c = SessionController::new();
        let err = c.start(RoutineTemplate::new("Empty", vec![])).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyCollection(_))));
        assert!(c.session().is_none());
    }

    #[test]
    fn completing_last_habit_emits_completion() {
        let mut c = SessionController::new();
        c.start(template(&["a", "b"])).unwrap();
        assert_eq!(names(&c.complete(Some(5), None).unwrap()), vec!["HabitCompleted"]);
        assert_eq!(
            names(&c.skip(Some("late".into())).unwrap()),
            vec!["HabitSkipped", "SessionCompleted"]
        );
        assert!(!c.is_running());
        assert!(matches!(
            c.complete(None, None),
            Err(CoreError::RoutineState(RoutineStateError::SessionCompleted { .. }))
        ));

        let finished = c.take_finished().unwrap();
        assert_eq!(finished.summary().skipped_count, 1);
        assert!(c.session().is_none());
    }

    #[test]
    fn undo_reports_cursor_and_dropped_record() {
        let mut c = SessionController::new();
        c.start(template(&["a", "b"])).unwrap();
        c.complete(None, None).unwrap();
        assert_eq!(names(&c.undo().unwrap()), vec!["CursorMoved", "HabitUndone"]);
        assert!(c.undo().unwrap().is_empty());
    }

    #[test]
    fn modifications_emit_events_only_when_applied() {
        let mut c = SessionController::new();
        c.start(template(&["a", "b"])).unwrap();
        assert_eq!(
            names(&c.add_habit(Habit::task("c"), None).unwrap()),
            vec!["SessionModified"]
        );
        assert!(c.remove_habit("missing").unwrap().is_empty());
        assert!(c.reorder(0, 0).unwrap().is_empty());
        assert_eq!(names(&c.reorder(0, 2).unwrap()), vec!["SessionModified"]);
    }

    #[test]
    fn invalid_habit_is_rejected_before_touching_session() {
        let mut c = SessionController::new();
        c.start(template(&["a"])).unwrap();
        let err = c.add_habit(Habit::task("  "), None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(c.session().unwrap().modifications().is_empty());
    }

    #[test]
    fn choosing_branch_emits_response() {
        let option = ConditionalOption::new("Rain", vec![Habit::task("Umbrella")]);
        let option_id = option.id.clone();
        let info = ConditionalHabitInfo::new("Weather?", vec![option]).unwrap();
        let t = RoutineTemplate::new(
            "Commute",
            vec![Habit::new("Check", HabitType::Conditional(info)), Habit::task("Go")],
        );

        let mut c = SessionController::new();
        c.start(t).unwrap();
        let events = c.choose(&option_id).unwrap();
        match &events[0] {
            Event::BranchChosen {
                response,
                injected_count,
                ..
            } => {
                assert_eq!(response.option_text, "Rain");
                assert_eq!(*injected_count, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(c.choose("nope").unwrap().is_empty());
    }

    #[test]
    fn cancel_clears_and_allows_restart() {
        let mut c = SessionController::new();
        c.start(template(&["a"])).unwrap();
        assert_eq!(c.cancel().unwrap().name(), "SessionCancelled");
        assert!(c.start(template(&["b"])).is_ok());
    }

    #[test]
    fn controller_persists_as_json() {
        let mut c = SessionController::new();
        c.start(template(&["a", "b"])).unwrap();
        c.complete(None, None).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: SessionController = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.session().unwrap().current_index(), 1);
    }
}
