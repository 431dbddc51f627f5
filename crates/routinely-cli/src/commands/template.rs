use clap::Subcommand;
use routinely_core::habit::TimerStyle;
use routinely_core::{ContextRule, Database, Habit, HabitType, RoutineTemplate, TimeSlot};

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List templates
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one template as JSON
    Show {
        /// Template ID
        id: String,
    },
    /// Create a template
    Add {
        /// Template name
        name: String,
        /// Habit, as "Name" or "Name:SECONDS" for a timer (repeatable)
        #[arg(long = "habit", required_unless_present = "file")]
        habits: Vec<String>,
        /// Read the whole template from a JSON file instead
        #[arg(long, conflicts_with = "habits")]
        file: Option<String>,
        /// Time slot the routine is for (repeatable)
        #[arg(long = "slot")]
        slots: Vec<TimeSlot>,
        /// Day category ID the routine is for (repeatable)
        #[arg(long = "day")]
        days: Vec<String>,
        /// Saved location ID the routine is for (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,
        /// Rule priority
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        priority: i32,
        /// Make this the default routine
        #[arg(long)]
        default: bool,
    },
    /// Delete a template
    Remove {
        /// Template ID
        id: String,
    },
    /// Make a template the default
    Default {
        /// Template ID
        id: String,
    },
}

/// "Stretch" is a checkbox, "Plank:60" a 60 second countdown.
fn parse_habit(raw: &str) -> Result<Habit, Box<dyn std::error::Error>> {
    match raw.rsplit_once(':') {
        Some((name, secs)) if !secs.is_empty() && secs.chars().all(|c| c.is_ascii_digit()) => {
            Ok(Habit::new(
                name.trim(),
                HabitType::Timer {
                    style: TimerStyle::Down,
                    duration_secs: secs.parse()?,
                    steps: Vec::new(),
                },
            ))
        }
        _ => Ok(Habit::task(raw.trim())),
    }
}

fn format_duration(secs: u64) -> String {
    if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

pub fn run(action: TemplateAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TemplateAction::List { json } => {
            let templates = db.list_templates()?;
            if json {
                super::print_json(&templates)?;
            } else if templates.is_empty() {
                println!("No templates found.");
            } else {
                for t in &templates {
                    let marker = if t.is_default { " (default)" } else { "" };
                    println!(
                        "{}  {}{}  {} habits, ~{}",
                        t.id,
                        t.name,
                        marker,
                        t.active_habits().len(),
                        format_duration(t.estimated_duration_secs())
                    );
                }
            }
        }
        TemplateAction::Show { id } => match db.get_template(&id)? {
            Some(t) => super::print_json(&t)?,
            None => return Err(format!("template not found: {id}").into()),
        },
        TemplateAction::Add {
            name,
            habits,
            file,
            slots,
            days,
            locations,
            priority,
            default,
        } => {
            let mut template = match file {
                Some(path) => {
                    let mut t: RoutineTemplate =
                        serde_json::from_str(&std::fs::read_to_string(path)?)?;
                    t.name = name;
                    t
                }
                None => {
                    let habits = habits
                        .iter()
                        .map(|h| parse_habit(h))
                        .collect::<Result<Vec<_>, _>>()?;
                    RoutineTemplate::new(name, habits)
                }
            };

            if !slots.is_empty() || !days.is_empty() || !locations.is_empty() || priority != 0 {
                let mut rule = ContextRule::with_priority(priority);
                rule.time_slots.extend(slots);
                rule.day_categories.extend(days);
                rule.locations.extend(locations);
                template = template.with_rule(rule);
            }

            db.save_template(&template)?;
            if default {
                db.set_default_template(&template.id)?;
            }
            println!("Template created: {}", template.id);
        }
        TemplateAction::Remove { id } => {
            if db.delete_template(&id)? {
                println!("Template deleted: {id}");
            } else {
                return Err(format!("template not found: {id}").into());
            }
        }
        TemplateAction::Default { id } => {
            db.set_default_template(&id)?;
            println!("Default template: {id}");
        }
    }
    Ok(())
}
