use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Environment variable holding the log filter, e.g. `routinely_core=debug`.
const LOG_ENV: &str = "ROUTINELY_LOG";

#[derive(Parser)]
#[command(name = "routinely", version, about = "Routinely CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Routine template management
    Template {
        #[command(subcommand)]
        action: commands::template::TemplateAction,
    },
    /// Show the current context
    Context(commands::context::ContextArgs),
    /// Pick the routine for the current context
    Select(commands::select::SelectArgs),
    /// Run a routine
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Day category management
    Category {
        #[command(subcommand)]
        action: commands::category::CategoryAction,
    },
    /// Saved location management
    Location {
        #[command(subcommand)]
        action: commands::location::LocationAction,
    },
    /// Companion device messages
    Companion {
        #[command(subcommand)]
        action: commands::companion::CompanionAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Write a backup bundle
    Export(commands::export::ExportArgs),
    /// Restore a backup bundle
    Import(commands::export::ImportArgs),
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Template { action } => commands::template::run(action),
        Commands::Context(args) => commands::context::run(args),
        Commands::Select(args) => commands::select::run(args),
        Commands::Session { action } => commands::session::run(action),
        Commands::Category { action } => commands::category::run(action),
        Commands::Location { action } => commands::location::run(action),
        Commands::Companion { action } => commands::companion::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Export(args) => commands::export::run_export(args),
        Commands::Import(args) => commands::export::run_import(args),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "routinely",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
