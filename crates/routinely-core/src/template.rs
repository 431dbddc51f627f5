//! Routine templates and their context rules.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::TimeSlot;
use crate::error::ValidationError;
use crate::habit::{renumber, Habit};

/// Per-template predicate used to pick a routine for the current context.
///
/// An empty set on an axis matches anything on that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRule {
    #[serde(default)]
    pub time_slots: BTreeSet<TimeSlot>,
    #[serde(default)]
    pub day_categories: BTreeSet<String>,
    #[serde(default)]
    pub locations: BTreeSet<String>,
    #[serde(default)]
    pub priority: i32,
}

impl ContextRule {
    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn time_slot(mut self, slot: TimeSlot) -> Self {
        self.time_slots.insert(slot);
        self
    }

    pub fn day_category(mut self, id: impl Into<String>) -> Self {
        self.day_categories.insert(id.into());
        self
    }

    pub fn location(mut self, id: impl Into<String>) -> Self {
        self.locations.insert(id.into());
        self
    }

    /// True when no axis constrains anything.
    pub fn is_wildcard(&self) -> bool {
        self.time_slots.is_empty() && self.day_categories.is_empty() && self.locations.is_empty()
    }
}

/// A named, ordered, reusable collection of habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub context_rule: Option<ContextRule>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

fn default_color() -> String {
    "#3b82f6".into()
}

impl RoutineTemplate {
    pub fn new(name: impl Into<String>, habits: Vec<Habit>) -> Self {
        let mut habits = habits;
        renumber(&mut habits);
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            habits,
            color: default_color(),
            is_default: false,
            context_rule: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    pub fn with_rule(mut self, rule: ContextRule) -> Self {
        self.context_rule = Some(rule);
        self
    }

    /// Active habits in `order`.
    pub fn active_habits(&self) -> Vec<Habit> {
        let mut active: Vec<Habit> = self.habits.iter().filter(|h| h.is_active).cloned().collect();
        active.sort_by_key(|h| h.order);
        active
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|h| h.id == habit_id)
    }

    pub fn add_habit(&mut self, habit: Habit) {
        self.habits.push(habit);
        renumber(&mut self.habits);
    }

    pub fn remove_habit(&mut self, habit_id: &str) -> Option<Habit> {
        let idx = self.habits.iter().position(|h| h.id == habit_id)?;
        let removed = self.habits.remove(idx);
        renumber(&mut self.habits);
        Some(removed)
    }

    /// Move the habit at `from` so it ends up at `to`.
    ///
    /// # Errors
    /// Returns [`ValidationError::OutOfBounds`] when either index is invalid.
    pub fn move_habit(&mut self, from: usize, to: usize) -> Result<(), ValidationError> {
        let len = self.habits.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::OutOfBounds {
                    collection: "habits".into(),
                    index,
                    len,
                });
            }
        }
        let habit = self.habits.remove(from);
        self.habits.insert(to, habit);
        renumber(&mut self.habits);
        Ok(())
    }

    pub fn estimated_duration_secs(&self) -> u64 {
        self.active_habits()
            .iter()
            .map(Habit::estimated_duration_secs)
            .sum()
    }

    pub fn mark_used(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
    }

    /// # Errors
    /// Returns the first problem found with the name or the habits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        if !self.habits.iter().any(|h| h.is_active) {
            return Err(ValidationError::EmptyCollection(format!(
                "active habits in routine '{}'",
                self.name
            )));
        }
        for habit in &self.habits {
            habit.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(habits: &[Habit]) -> Vec<&str> {
        habits.iter().map(|h| h.name.as_str()).collect()
    }

    #[test]
    fn new_template_numbers_habits() {
        let t = RoutineTemplate::new("Morning", vec![Habit::task("a"), Habit::task("b")]);
        assert_eq!(t.habits[0].order, 0);
        assert_eq!(t.habits[1].order, 1);
    }

    #[test]
    fn active_habits_skip_inactive_and_sort() {
        let mut t = RoutineTemplate::new(
            "Morning",
            vec![Habit::task("a"), Habit::task("b"), Habit::task("c")],
        );
        t.habits[1].is_active = false;
        t.habits[0].order = 5;
        assert_eq!(names(&t.active_habits()), vec!["c", "a"]);
    }

    #[test]
    fn move_habit_keeps_orders_contiguous() {
        let mut t = RoutineTemplate::new(
            "Morning",
            vec![Habit::task("a"), Habit::task("b"), Habit::task("c")],
        );
        t.move_habit(0, 2).unwrap();
        assert_eq!(names(&t.habits), vec!["b", "c", "a"]);
        let orders: Vec<u32> = t.habits.iter().map(|h| h.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(t.move_habit(0, 3).is_err());
    }

    #[test]
    fn remove_habit_renumbers() {
        let mut t = RoutineTemplate::new(
            "Morning",
            vec![Habit::task("a"), Habit::task("b"), Habit::task("c")],
        );
        let id = t.habits[0].id.clone();
        assert!(t.remove_habit(&id).is_some());
        assert_eq!(t.habits[0].order, 0);
        assert_eq!(t.habits[1].order, 1);
        assert!(t.remove_habit(&id).is_none());
    }

    #[test]
    fn active_orders_stay_contiguous_around_inactive_habits() {
        let active_orders = |t: &RoutineTemplate| -> Vec<u32> {
            t.active_habits().iter().map(|h| h.order).collect()
        };
        let mut t = RoutineTemplate::new(
            "Morning",
            vec![Habit::task("a"), Habit::task("b"), Habit::task("c")],
        );
        t.habits[1].is_active = false;

        t.add_habit(Habit::task("d"));
        assert_eq!(active_orders(&t), vec![0, 1, 2]);
        assert_eq!(names(&t.active_habits()), vec!["a", "c", "d"]);
        assert_eq!(t.habits[1].order, 3);

        let first = t.habits[0].id.clone();
        t.remove_habit(&first);
        assert_eq!(active_orders(&t), vec![0, 1]);

        t.move_habit(2, 0).unwrap();
        assert_eq!(active_orders(&t), vec![0, 1]);
        assert_eq!(names(&t.active_habits()), vec!["d", "c"]);
    }

    #[test]
    fn validate_rejects_templates_without_active_habits() {
        let empty = RoutineTemplate::new("Empty", vec![]);
        assert!(matches!(
            empty.validate(),
            Err(ValidationError::EmptyCollection(_))
        ));

        let mut inactive = RoutineTemplate::new("Inactive", vec![Habit::task("a")]);
        inactive.habits[0].is_active = false;
        assert!(inactive.validate().is_err());

        let ok = RoutineTemplate::new("Ok", vec![Habit::task("a")]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn context_rule_builder() {
        let rule = ContextRule::with_priority(2)
            .time_slot(TimeSlot::Morning)
            .day_category("weekday");
        assert!(!rule.is_wildcard());
        assert!(rule.locations.is_empty());
        assert!(ContextRule::default().is_wildcard());
    }
}
