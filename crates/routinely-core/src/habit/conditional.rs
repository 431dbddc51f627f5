//! Conditional (branching question) habits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Habit;
use crate::error::ValidationError;

/// A conditional habit offers at most this many answers.
pub const MAX_OPTIONS: usize = 4;

/// One answer to a conditional habit and the habits it adds to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub habits: Vec<Habit>,
}

impl ConditionalOption {
    pub fn new(text: impl Into<String>, habits: Vec<Habit>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            habits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalHabitInfo {
    pub question: String,
    options: Vec<ConditionalOption>,
}

impl ConditionalHabitInfo {
    /// # Errors
    /// Returns [`ValidationError::TooMany`] for more than [`MAX_OPTIONS`] options.
    pub fn new(
        question: impl Into<String>,
        options: Vec<ConditionalOption>,
    ) -> Result<Self, ValidationError> {
        check_option_count(options.len())?;
        Ok(Self {
            question: question.into(),
            options,
        })
    }

    pub fn options(&self) -> &[ConditionalOption] {
        &self.options
    }

    pub fn option(&self, option_id: &str) -> Option<&ConditionalOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// # Errors
    /// Returns [`ValidationError::TooMany`] when the habit already has
    /// [`MAX_OPTIONS`] options.
    pub fn push_option(&mut self, option: ConditionalOption) -> Result<(), ValidationError> {
        check_option_count(self.options.len() + 1)?;
        self.options.push(option);
        Ok(())
    }

    pub fn remove_option(&mut self, option_id: &str) -> Option<ConditionalOption> {
        let idx = self.options.iter().position(|o| o.id == option_id)?;
        Some(self.options.remove(idx))
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        if self.question.trim().is_empty() {
            return Err(ValidationError::invalid("question", "must not be empty"));
        }
        if self.options.is_empty() {
            return Err(ValidationError::EmptyCollection("conditional options".into()));
        }
        check_option_count(self.options.len())?;
        for option in &self.options {
            if option.text.trim().is_empty() {
                return Err(ValidationError::invalid("option.text", "must not be empty"));
            }
            for habit in &option.habits {
                habit.validate()?;
            }
        }
        Ok(())
    }
}

fn check_option_count(len: usize) -> Result<(), ValidationError> {
    if len > MAX_OPTIONS {
        return Err(ValidationError::TooMany {
            collection: "conditional options".into(),
            len,
            max: MAX_OPTIONS,
        });
    }
    Ok(())
}

/// Answer given to a conditional habit. Stored append-only for history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalResponse {
    pub id: String,
    pub habit_id: String,
    pub question: String,
    pub option_id: String,
    pub option_text: String,
    #[serde(default)]
    pub routine_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub answered_at: DateTime<Utc>,
}
