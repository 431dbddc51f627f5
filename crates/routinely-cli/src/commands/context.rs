use clap::Args;
use routinely_core::Config;

use super::WhereWhen;

#[derive(Args)]
pub struct ContextArgs {
    #[command(flatten)]
    pub place: WhereWhen,
    /// One-line summary instead of JSON
    #[arg(long)]
    pub short: bool,
}

pub fn run(args: ContextArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let context = args.place.classify(&config.context)?;
    if args.short {
        println!("{}", context.describe());
    } else {
        super::print_json(&context)?;
    }
    Ok(())
}
