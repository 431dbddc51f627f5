use chrono::Utc;
use clap::Subcommand;
use routinely_core::{
    Config, Database, Event, Habit, KeyValueStore, RoutineSelector, RoutineTemplate,
    SessionController,
};

use super::WhereWhen;

const SESSION_KEY: &str = "session.active";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a routine (the selected one if no ID is given)
    Start {
        /// Template ID
        template_id: Option<String>,
        #[command(flatten)]
        place: WhereWhen,
    },
    /// Print the session state as JSON
    Status,
    /// Complete the current habit
    Complete {
        /// Time spent, in seconds
        #[arg(long)]
        duration: Option<u64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Skip the current habit
    Skip {
        #[arg(long)]
        reason: Option<String>,
    },
    /// Go back one habit, undoing it
    Back,
    /// Jump to a habit by position (0-based)
    Goto { index: usize },
    /// Answer the current question habit
    Choose {
        /// Option ID, 1-based number, or option text
        option: String,
    },
    /// Add a habit to this run only
    Add {
        /// Habit name
        name: String,
        /// Position (0-based); appended if omitted
        #[arg(long)]
        at: Option<usize>,
    },
    /// Remove a habit from this run only
    Remove { habit_id: String },
    /// Move a habit within this run
    Reorder { from: usize, to: usize },
    /// Abandon the session
    Cancel,
    /// Open the current habit's app or website
    Open,
    /// Finished sessions, newest first
    History {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub(super) fn load_controller(db: &Database) -> SessionController {
    match db.load::<SessionController>(SESSION_KEY) {
        Ok(Some(controller)) => controller,
        Ok(None) => SessionController::new(),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable session state");
            SessionController::new()
        }
    }
}

/// Persist what the last command changed: branch answers, a finished
/// session's summary, and the controller itself.
pub(super) fn settle(
    db: &Database,
    controller: &mut SessionController,
    events: &[Event],
) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        if let Event::BranchChosen { response, .. } = event {
            db.record_response(response)?;
        }
    }
    if let Some(finished) = controller.take_finished() {
        db.record_session(&finished.summary())?;
    }
    if controller.session().is_some() {
        db.save(SESSION_KEY, &*controller)?;
    } else {
        db.delete(SESSION_KEY)?;
    }
    Ok(())
}

/// Start `template` and persist the new session. Shared with `select --start`.
pub fn start_template(
    db: &Database,
    template: RoutineTemplate,
) -> Result<Event, Box<dyn std::error::Error>> {
    let mut controller = load_controller(db);
    let template_id = template.id.clone();
    let event = controller.start(template)?;
    db.mark_template_used(&template_id, Utc::now())?;
    settle(db, &mut controller, std::slice::from_ref(&event))?;
    Ok(event)
}

fn resolve_option(
    controller: &SessionController,
    option: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    let habit = controller
        .session()
        .and_then(|s| s.current_habit())
        .ok_or("no current habit")?;
    let info = habit
        .habit_type
        .as_conditional()
        .ok_or_else(|| format!("'{}' is not a question", habit.name))?;

    if let Some(found) = info.option(option) {
        return Ok(found.id.clone());
    }
    if let Ok(n) = option.parse::<usize>() {
        if let Some(found) = n.checked_sub(1).and_then(|i| info.options().get(i)) {
            return Ok(found.id.clone());
        }
    }
    info.options()
        .iter()
        .find(|o| o.text.eq_ignore_ascii_case(option))
        .map(|o| o.id.clone())
        .ok_or_else(|| format!("no option '{option}' for \"{}\"", info.question).into())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut controller = load_controller(&db);

    let events: Vec<Event> = match action {
        SessionAction::Start { template_id, place } => {
            let template = match template_id {
                Some(id) => db
                    .get_template(&id)?
                    .ok_or_else(|| format!("template not found: {id}"))?,
                None => {
                    let config = Config::load()?;
                    let context = place.classify(&config.context)?;
                    let templates = db.list_templates()?;
                    let selection = RoutineSelector::new().select(&templates, &context);
                    selection
                        .template
                        .cloned()
                        .ok_or_else(|| selection.reason.clone())?
                }
            };
            let event = start_template(&db, template)?;
            return super::print_json(&event);
        }
        SessionAction::Status => {
            let snapshot = controller.snapshot()?;
            let habit = controller.session().and_then(|s| s.current_habit());
            return super::print_json(&serde_json::json!({
                "snapshot": snapshot,
                "current_habit": habit,
            }));
        }
        SessionAction::Complete { duration, notes } => controller.complete(duration, notes)?,
        SessionAction::Skip { reason } => controller.skip(reason)?,
        SessionAction::Back => controller.undo()?,
        SessionAction::Goto { index } => controller.go_to(index)?,
        SessionAction::Choose { option } => {
            let option_id = resolve_option(&controller, &option)?;
            controller.choose(&option_id)?
        }
        SessionAction::Add { name, at } => controller.add_habit(Habit::task(name), at)?,
        SessionAction::Remove { habit_id } => controller.remove_habit(&habit_id)?,
        SessionAction::Reorder { from, to } => controller.reorder(from, to)?,
        SessionAction::Cancel => vec![controller.cancel()?],
        SessionAction::Open => {
            let habit = controller
                .session()
                .and_then(|s| s.current_habit())
                .ok_or("no current habit")?;
            let target = habit
                .habit_type
                .launch_target()
                .ok_or_else(|| format!("'{}' has nothing to open", habit.name))?;
            open::that(target)?;
            println!("Opened {target}");
            return Ok(());
        }
        SessionAction::History { limit } => {
            return super::print_json(&db.list_sessions(limit)?);
        }
    };

    settle(&db, &mut controller, &events)?;
    super::print_json(&events)
}
