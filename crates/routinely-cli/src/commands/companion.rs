use std::io::Write;

use clap::Subcommand;
use routinely_core::{apply_companion_message, CompanionMessage, Config, Database};

use super::session::{load_controller, settle};

#[derive(Subcommand)]
pub enum CompanionAction {
    /// Write the templates message for the companion device
    Templates {
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<String>,
    },
    /// Apply a message received from the companion device
    Apply {
        /// Message file
        file: String,
    },
}

pub fn run(action: CompanionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        CompanionAction::Templates { output } => {
            let config = Config::load()?;
            if !config.companion.enabled {
                return Err("companion sync is disabled (companion.enabled = false)".into());
            }
            let message = CompanionMessage::templates(
                &db.list_templates()?,
                config.companion.include_device_habits,
            );
            let bytes = message.encode()?;
            match output {
                Some(path) => std::fs::write(path, bytes)?,
                None => {
                    let mut stdout = std::io::stdout();
                    stdout.write_all(&bytes)?;
                    writeln!(stdout)?;
                }
            }
        }
        CompanionAction::Apply { file } => {
            let message = CompanionMessage::decode(&std::fs::read(file)?)?;
            let mut controller = load_controller(&db);
            let events = apply_companion_message(&mut controller, &message)?;
            settle(&db, &mut controller, &events)?;
            super::print_json(&events)?;
        }
    }
    Ok(())
}
