//! Session modification log.
//!
//! A session never edits its template. Ad-hoc changes are appended as
//! [`SessionModification`]s and the effective habit list is rebuilt by
//! replaying them, in order, over the template's active habits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::habit::{renumber, Habit};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModificationKind {
    /// Insert `habit` at `index` (clamped), or append when `index` is `None`.
    Added { habit: Habit, index: Option<usize> },
    Removed { habit_id: String },
    /// Replace the habit with the same id.
    Modified { habit: Habit },
    /// Replace the whole list.
    Reordered { habits: Vec<Habit> },
}

impl ModificationKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModificationKind::Added { .. } => "added",
            ModificationKind::Removed { .. } => "removed",
            ModificationKind::Modified { .. } => "modified",
            ModificationKind::Reordered { .. } => "reordered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionModification {
    pub id: String,
    pub at: DateTime<Utc>,
    pub kind: ModificationKind,
}

impl SessionModification {
    pub fn new(kind: ModificationKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            at: Utc::now(),
            kind,
        }
    }
}

/// Replay `modifications` over `base`. Pure; `order` is renumbered after
/// every step so it stays contiguous.
pub fn apply_modifications(base: &[Habit], modifications: &[SessionModification]) -> Vec<Habit> {
    let mut habits = base.to_vec();
    renumber(&mut habits);
    for modification in modifications {
        apply_one(&mut habits, &modification.kind);
        renumber(&mut habits);
    }
    habits
}

fn apply_one(habits: &mut Vec<Habit>, kind: &ModificationKind) {
    match kind {
        ModificationKind::Added { habit, index } => {
            let at = index.unwrap_or(habits.len()).min(habits.len());
            habits.insert(at, habit.clone());
        }
        ModificationKind::Removed { habit_id } => {
            habits.retain(|h| &h.id != habit_id);
        }
        ModificationKind::Modified { habit } => {
            if let Some(existing) = habits.iter_mut().find(|h| h.id == habit.id) {
                *existing = habit.clone();
            }
        }
        ModificationKind::Reordered { habits: reordered } => {
            *habits = reordered.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(habits: &[Habit]) -> Vec<String> {
        habits.iter().map(|h| h.name.clone()).collect()
    }

    fn base() -> Vec<Habit> {
        vec![Habit::task("a"), Habit::task("b"), Habit::task("c")]
    }

    #[test]
    fn empty_log_returns_base_renumbered() {
        let mut habits = base();
        habits[0].order = 9;
        let out = apply_modifications(&habits, &[]);
        assert_eq!(names(&out), vec!["a", "b", "c"]);
        assert_eq!(out[0].order, 0);
    }

    #[test]
    fn replays_in_append_order() {
        let habits = base();
        let mut renamed = habits[1].clone();
        renamed.name = "B!".into();
        let log = vec![
            SessionModification::new(ModificationKind::Added {
                habit: Habit::task("d"),
                index: Some(1),
            }),
            SessionModification::new(ModificationKind::Removed {
                habit_id: habits[0].id.clone(),
            }),
            SessionModification::new(ModificationKind::Modified { habit: renamed }),
            SessionModification::new(ModificationKind::Added {
                habit: Habit::task("e"),
                index: None,
            }),
        ];
        let out = apply_modifications(&habits, &log);
        assert_eq!(names(&out), vec!["d", "B!", "c", "e"]);
        let orders: Vec<u32> = out.iter().map(|h| h.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn out_of_range_insert_is_clamped() {
        let log = vec![SessionModification::new(ModificationKind::Added {
            habit: Habit::task("z"),
            index: Some(99),
        })];
        let out = apply_modifications(&base(), &log);
        assert_eq!(names(&out), vec!["a", "b", "c", "z"]);
    }

    #[test]
    fn modifying_unknown_habit_is_ignored() {
        let log = vec![SessionModification::new(ModificationKind::Modified {
            habit: Habit::task("ghost"),
        })];
        assert_eq!(names(&apply_modifications(&base(), &log)), vec!["a", "b", "c"]);
    }

    #[test]
    fn reorder_replaces_list() {
        let habits = base();
        let reversed: Vec<Habit> = habits.iter().rev().cloned().collect();
        let log = vec![SessionModification::new(ModificationKind::Reordered {
            habits: reversed,
        })];
        let out = apply_modifications(&habits, &log);
        assert_eq!(names(&out), vec!["c", "b", "a"]);
        assert_eq!(out[0].order, 0);
    }

    #[test]
    fn modification_serializes_with_type_tag() {
        let m = SessionModification::new(ModificationKind::Removed {
            habit_id: "h1".into(),
        });
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["kind"]["type"], "removed");
        assert_eq!(json["kind"]["habit_id"], "h1");
    }
}
