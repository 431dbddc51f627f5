use clap::Args;
use routinely_core::{Config, Database, ExportBundle};

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (stdout if omitted)
    #[arg(long, short)]
    pub output: Option<String>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Bundle written by `routinely export`
    pub file: String,
    /// Also replace the context settings in the config file
    #[arg(long)]
    pub with_settings: bool,
}

pub fn run_export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let bundle = ExportBundle::from_database(&db, config.context)?;
    let json = bundle.to_json()?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            eprintln!(
                "Exported {} templates and {} answers to {path}",
                bundle.templates.len(),
                bundle.responses.len()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn run_import(args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bundle = ExportBundle::from_json(&std::fs::read_to_string(&args.file)?)?;
    let db = Database::open()?;
    let summary = bundle.import_into(&db)?;
    if args.with_settings {
        let mut config = Config::load()?;
        config.context = bundle.settings;
        config.save()?;
    }
    super::print_json(&summary)
}
