//! Messages exchanged with the companion (wrist) device.
//!
//! The phone sends a trimmed copy of its templates; the companion sends
//! back completion records for the session it ran. Transport, delivery and
//! retries belong to the device adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::events::Event;
use crate::habit::{renumber, HabitType};
use crate::session::{HabitCompletion, SessionController};
use crate::template::RoutineTemplate;

/// Bumped whenever the message layout changes incompatibly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Companion message errors.
#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    #[error("Malformed companion message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported companion protocol version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Completions are for session {found}, but the active session is {expected}")]
    SessionMismatch { expected: String, found: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompanionMessage {
    /// Phone to companion.
    Templates {
        templates: Vec<RoutineTemplate>,
        sent_at: DateTime<Utc>,
    },
    /// Companion to phone.
    Completions {
        session_id: String,
        routine_id: String,
        completions: Vec<HabitCompletion>,
        sent_at: DateTime<Utc>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(flatten)]
    message: CompanionMessage,
}

/// Whether the companion can run a habit of this type by itself.
fn runs_on_companion(habit_type: &HabitType) -> bool {
    !habit_type.requires_device()
}

/// The subset of `templates` the companion mirrors.
///
/// Inactive habits are dropped. App-launch and website habits are dropped
/// too unless `include_device_habits` is set. Templates left without any
/// habit are not sent.
pub fn templates_for_companion(
    templates: &[RoutineTemplate],
    include_device_habits: bool,
) -> Vec<RoutineTemplate> {
    templates
        .iter()
        .filter_map(|template| {
            let mut habits: Vec<_> = template
                .active_habits()
                .into_iter()
                .filter(|h| include_device_habits || runs_on_companion(&h.habit_type))
                .collect();
            if habits.is_empty() {
                return None;
            }
            renumber(&mut habits);
            let mut mirrored = template.clone();
            mirrored.habits = habits;
            Some(mirrored)
        })
        .collect()
}

impl CompanionMessage {
    pub fn templates(templates: &[RoutineTemplate], include_device_habits: bool) -> Self {
        CompanionMessage::Templates {
            templates: templates_for_companion(templates, include_device_habits),
            sent_at: Utc::now(),
        }
    }

    /// # Errors
    /// Returns an error if the message cannot be serialized.
    pub fn encode(&self) -> Result<Vec<u8>, CompanionError> {
        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            message: self.clone(),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// # Errors
    /// Returns an error for malformed bytes or another protocol version.
    pub fn decode(bytes: &[u8]) -> Result<Self, CompanionError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(CompanionError::UnsupportedVersion {
                found: envelope.version,
                expected: PROTOCOL_VERSION,
            });
        }
        Ok(envelope.message)
    }
}

/// Fold a companion `Completions` message into the running session.
///
/// Other message kinds are ignored. Records the session already has are
/// not duplicated.
///
/// # Errors
/// Fails without a running session, or when the message belongs to a
/// different session.
pub fn apply_companion_message(
    controller: &mut SessionController,
    message: &CompanionMessage,
) -> Result<Vec<Event>, CoreError> {
    let CompanionMessage::Completions {
        session_id,
        completions,
        ..
    } = message
    else {
        return Ok(Vec::new());
    };

    if let Some(active) = controller.session() {
        if &active.id != session_id {
            return Err(CompanionError::SessionMismatch {
                expected: active.id.clone(),
                found: session_id.clone(),
            }
            .into());
        }
    }
    let events = controller.merge(completions)?;
    tracing::debug!(session = %session_id, events = events.len(), "companion completions applied");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoutineStateError;
    use crate::habit::Habit;

    fn template_with_device_habit() -> RoutineTemplate {
        RoutineTemplate::new(
            "Morning",
            vec![
                Habit::task("Water"),
                Habit::new(
                    "News",
                    HabitType::Website {
                        url: "https://example.com".into(),
                        title: None,
                        duration_secs: 300,
                    },
                ),
                Habit::task("Stretch"),
            ],
        )
    }

    fn only_website() -> RoutineTemplate {
        RoutineTemplate::new(
            "Reading",
            vec![Habit::new(
                "Blog",
                HabitType::Website {
                    url: "https://example.com/blog".into(),
                    title: None,
                    duration_secs: 600,
                },
            )],
        )
    }

    #[test]
    fn device_habits_are_stripped_by_default() {
        let out = templates_for_companion(&[template_with_device_habit(), only_website()], false);
        assert_eq!(out.len(), 1);
        let names: Vec<&str> = out[0].habits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Water", "Stretch"]);
        assert_eq!(out[0].habits[1].order, 1);
    }

    #[test]
    fn device_habits_kept_when_requested() {
        let out = templates_for_companion(&[template_with_device_habit(), only_website()], true);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].habits.len(), 3);
    }

    #[test]
    fn encode_then_decode_keeps_message() {
        let message = CompanionMessage::templates(&[template_with_device_habit()], false);
        let bytes = message.encode().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["version"], PROTOCOL_VERSION);
        assert_eq!(json["type"], "templates");
        assert_eq!(CompanionMessage::decode(&bytes).unwrap(), message);
    }

    #[test]
    fn decode_rejects_garbage_and_other_versions() {
        assert!(matches!(
            CompanionMessage::decode(b"not json"),
            Err(CompanionError::Malformed(_))
        ));
        let future = br#"{"version":99,"type":"completions","session_id":"s","routine_id":"r","completions":[],"sent_at":"2024-01-01T00:00:00Z"}"#;
        assert!(matches!(
            CompanionMessage::decode(future),
            Err(CompanionError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn completions_merge_into_matching_session() {
        let mut controller = SessionController::new();
        controller
            .start(RoutineTemplate::new(
                "Evening",
                vec![Habit::task("a"), Habit::task("b")],
            ))
            .unwrap();
        let session = controller.session().unwrap();
        let first = session.effective_habits()[0].id.clone();
        let record = HabitCompletion {
            habit_id: first,
            completed_at: Utc::now(),
            duration_secs: Some(30),
            is_skipped: false,
            notes: None,
        };
        let message = CompanionMessage::Completions {
            session_id: session.id.clone(),
            routine_id: session.template().id.clone(),
            completions: vec![record.clone(), record],
            sent_at: Utc::now(),
        };

        let events = apply_companion_message(&mut controller, &message).unwrap();
        assert_eq!(events[0].name(), "CompletionsMerged");
        let session = controller.session().unwrap();
        assert_eq!(session.completions().len(), 1);
        assert_eq!(session.current_index(), 1);

        // replaying the same message adds nothing
        assert!(apply_companion_message(&mut controller, &message).unwrap().is_empty());
    }

    #[test]
    fn completions_for_other_session_are_rejected() {
        let mut controller = SessionController::new();
        let message = CompanionMessage::Completions {
            session_id: "other".into(),
            routine_id: "r".into(),
            completions: vec![],
            sent_at: Utc::now(),
        };
        assert!(matches!(
            apply_companion_message(&mut controller, &message),
            Err(CoreError::RoutineState(RoutineStateError::NoActiveSession))
        ));

        controller.start(RoutineTemplate::new("Evening", vec![Habit::task("a")])).unwrap();
        assert!(matches!(
            apply_companion_message(&mut controller, &message),
            Err(CoreError::Companion(CompanionError::SessionMismatch { .. }))
        ));
    }
}
