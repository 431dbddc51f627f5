//! Context-aware routine selection.
//!
//! Each template's [`ContextRule`] is scored against the current
//! [`RoutineContext`]:
//!
//! ```text
//! score = priority * 1000 + (100 if any non-empty axis matched)
//! ```
//!
//! The match bonus is awarded once, however many axes matched, so priority
//! alone orders competing rules. Empty axes are wildcards: they never
//! exclude a template and earn no bonus. A template without a rule scores 1. A rule that
//! excludes the context on any non-empty axis removes the template.

use serde::Serialize;

use crate::context::RoutineContext;
use crate::template::{ContextRule, RoutineTemplate};

/// Score of a template that has no context rule.
pub const UNRULED_SCORE: i64 = 1;
/// Weight of the rule priority.
pub const PRIORITY_WEIGHT: i64 = 1000;
/// Bonus for a rule with at least one concretely matched axis.
pub const MATCH_BONUS: i64 = 100;

pub const NO_MATCH_REASON: &str = "no matching routine found";

/// Which non-empty axes of a rule matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AxisMatch {
    pub time_slot: bool,
    pub day_category: bool,
    pub location: bool,
}

impl AxisMatch {
    pub fn any(&self) -> bool {
        self.time_slot || self.day_category || self.location
    }
}

impl ContextRule {
    /// Concrete matches, or `None` if a non-empty axis excludes `context`.
    pub fn evaluate(&self, context: &RoutineContext) -> Option<AxisMatch> {
        let time_slot = axis(self.time_slots.is_empty(), || {
            self.time_slots.contains(&context.time_slot)
        })?;
        let day_category = axis(self.day_categories.is_empty(), || {
            self.day_categories.contains(&context.day_category)
        })?;
        let location = axis(self.locations.is_empty(), || {
            context
                .location
                .as_ref()
                .is_some_and(|id| self.locations.contains(id))
        })?;
        Some(AxisMatch {
            time_slot,
            day_category,
            location,
        })
    }

    pub fn matches(&self, context: &RoutineContext) -> bool {
        self.evaluate(context).is_some()
    }

    pub fn score(&self, context: &RoutineContext) -> Option<i64> {
        self.evaluate(context)
            .map(|m| {
                let bonus = if m.any() { MATCH_BONUS } else { 0 };
                i64::from(self.priority) * PRIORITY_WEIGHT + bonus
            })
    }
}

/// `Some(false)` for a wildcard axis, `Some(true)` for a concrete match,
/// `None` when the axis excludes the context.
fn axis(is_empty: bool, contains: impl FnOnce() -> bool) -> Option<bool> {
    if is_empty {
        Some(false)
    } else if contains() {
        Some(true)
    } else {
        None
    }
}

/// Score of a template, `None` if its rule excludes the context.
pub fn template_score(template: &RoutineTemplate, context: &RoutineContext) -> Option<i64> {
    match &template.context_rule {
        None => Some(UNRULED_SCORE),
        Some(rule) => rule.score(context),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    ContextMatch,
    Default,
    MostRecent,
    First,
    Nothing,
}

#[derive(Debug, Clone, Serialize)]
pub struct Candidate<'a> {
    pub template: &'a RoutineTemplate,
    pub score: i64,
}

/// Result of picking a routine for the current context.
#[derive(Debug, Clone, Serialize)]
pub struct Selection<'a> {
    pub template: Option<&'a RoutineTemplate>,
    pub score: i64,
    pub source: SelectionSource,
    /// One-line explanation for display.
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RoutineSelector;

impl RoutineSelector {
    pub fn new() -> Self {
        Self
    }

    /// Every eligible template with its score, best first. Equal scores keep
    /// input order.
    pub fn ranked<'a>(
        &self,
        templates: &'a [RoutineTemplate],
        context: &RoutineContext,
    ) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = templates
            .iter()
            .filter_map(|template| {
                template_score(template, context).map(|score| Candidate { template, score })
            })
            .collect();
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }

    /// Pick the template to present. Never fails.
    pub fn select<'a>(
        &self,
        templates: &'a [RoutineTemplate],
        context: &RoutineContext,
    ) -> Selection<'a> {
        let mut best: Option<Candidate<'a>> = None;
        for template in templates {
            let Some(score) = template_score(template, context) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(Candidate { template, score });
            }
        }

        let selection = match best {
            Some(candidate) if candidate.score > 0 => Selection {
                reason: match_reason(candidate.template, context),
                template: Some(candidate.template),
                score: candidate.score,
                source: SelectionSource::ContextMatch,
            },
            _ => fallback(templates),
        };
        tracing::debug!(
            template = selection.template.map(|t| t.name.as_str()),
            score = selection.score,
            source = ?selection.source,
            "selected routine"
        );
        selection
    }
}

fn pick(template: &RoutineTemplate, source: SelectionSource, reason: String) -> Selection<'_> {
    Selection {
        template: Some(template),
        score: 0,
        source,
        reason,
    }
}

fn fallback(templates: &[RoutineTemplate]) -> Selection<'_> {
    if let Some(template) = templates.iter().find(|t| t.is_default) {
        return pick(
            template,
            SelectionSource::Default,
            format!("{} is your default routine", template.name),
        );
    }

    // max_by_key returns the last maximum; keep the first instead.
    let mut recent: Option<&RoutineTemplate> = None;
    for template in templates.iter().filter(|t| t.last_used_at.is_some()) {
        if recent.map_or(true, |r| template.last_used_at > r.last_used_at) {
            recent = Some(template);
        }
    }
    if let Some(template) = recent {
        return pick(
            template,
            SelectionSource::MostRecent,
            format!("{} is your most recently used routine", template.name),
        );
    }

    match templates.first() {
        Some(template) => pick(
            template,
            SelectionSource::First,
            format!("{} is your first routine", template.name),
        ),
        None => Selection {
            template: None,
            score: 0,
            source: SelectionSource::Nothing,
            reason: NO_MATCH_REASON.to_string(),
        },
    }
}

fn match_reason(template: &RoutineTemplate, context: &RoutineContext) -> String {
    let Some(rule) = &template.context_rule else {
        return format!("{} fits any time", template.name);
    };
    let matched = rule.evaluate(context).unwrap_or_default();
    let mut parts = Vec::new();
    if matched.time_slot {
        parts.push(context.time_slot.display_name().to_lowercase());
    }
    if matched.day_category {
        parts.push(context.day_category_name.to_lowercase());
    }
    if matched.location {
        parts.push(format!("at {}", context.location_label()));
    }
    if parts.is_empty() {
        format!("{} fits any time", template.name)
    } else {
        format!("{} matches {}", template.name, parts.join(", "))
    }
}
