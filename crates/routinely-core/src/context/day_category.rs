//! Weekday categories ("weekday", "weekend", and user-defined ones such
//! as "gym day").

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub const WEEKDAY_CATEGORY: &str = "weekday";
pub const WEEKEND_CATEGORY: &str = "weekend";

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_builtin: bool,
}

impl DayCategory {
    fn builtin(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: None,
            is_builtin: true,
        }
    }
}

/// Built-in category a weekday belongs to when nothing else is assigned.
pub fn builtin_category_for(day: Weekday) -> &'static str {
    match day {
        Weekday::Sat | Weekday::Sun => WEEKEND_CATEGORY,
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri => {
            WEEKDAY_CATEGORY
        }
    }
}

/// Stable key used for weekday maps in config files.
pub fn weekday_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCategorySettings {
    #[serde(default = "default_categories")]
    pub categories: Vec<DayCategory>,
    /// Weekday key (`mon`..`sun`) to category id.
    #[serde(default = "default_assignments")]
    pub assignments: BTreeMap<String, String>,
}

fn default_categories() -> Vec<DayCategory> {
    vec![
        DayCategory::builtin(WEEKDAY_CATEGORY, "Weekday"),
        DayCategory::builtin(WEEKEND_CATEGORY, "Weekend"),
    ]
}

fn default_assignments() -> BTreeMap<String, String> {
    ALL_DAYS
        .into_iter()
        .map(|d| (weekday_key(d).to_string(), builtin_category_for(d).to_string()))
        .collect()
}

impl Default for DayCategorySettings {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            assignments: default_assignments(),
        }
    }
}

impl DayCategorySettings {
    pub fn category(&self, id: &str) -> Option<&DayCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Category for `day`. Dangling assignments resolve to the built-in
    /// category for that weekday.
    pub fn category_for(&self, day: Weekday) -> DayCategory {
        let assigned = self
            .assignments
            .get(weekday_key(day))
            .and_then(|id| self.category(id));
        if let Some(category) = assigned {
            return category.clone();
        }
        let id = builtin_category_for(day);
        self.category(id).cloned().unwrap_or_else(|| match id {
            WEEKEND_CATEGORY => DayCategory::builtin(WEEKEND_CATEGORY, "Weekend"),
            _ => DayCategory::builtin(WEEKDAY_CATEGORY, "Weekday"),
        })
    }

    pub fn add_category(
        &mut self,
        name: &str,
        color: Option<String>,
    ) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        let id = Uuid::new_v4().to_string();
        self.categories.push(DayCategory {
            id: id.clone(),
            name: name.to_string(),
            color,
            is_builtin: false,
        });
        Ok(id)
    }

    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| unknown(id))?;
        category.name = name.trim().to_string();
        Ok(())
    }

    pub fn assign(&mut self, day: Weekday, category_id: &str) -> Result<(), ValidationError> {
        if self.category(category_id).is_none() {
            return Err(unknown(category_id));
        }
        self.assignments
            .insert(weekday_key(day).to_string(), category_id.to_string());
        Ok(())
    }

    /// Remove a custom category. Its weekdays go back to their built-in
    /// category.
    pub fn delete_category(&mut self, id: &str) -> Result<DayCategory, ValidationError> {
        let idx = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| unknown(id))?;
        if self.categories[idx].is_builtin {
            return Err(ValidationError::BuiltinImmutable {
                kind: "day category".into(),
                id: id.to_string(),
            });
        }
        let removed = self.categories.remove(idx);
        for day in ALL_DAYS {
            let key = weekday_key(day);
            if self.assignments.get(key).map(String::as_str) == Some(id) {
                self.assignments
                    .insert(key.to_string(), builtin_category_for(day).to_string());
            }
        }
        Ok(removed)
    }

    pub fn weekdays_in(&self, category_id: &str) -> Vec<Weekday> {
        ALL_DAYS
            .into_iter()
            .filter(|d| self.category_for(*d).id == category_id)
            .collect()
    }
}

fn unknown(id: &str) -> ValidationError {
    ValidationError::UnknownId {
        kind: "day category".into(),
        id: id.to_string(),
    }
}
