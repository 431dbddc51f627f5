use chrono::Weekday;
use clap::Subcommand;
use routinely_core::context::day_category::weekday_key;
use routinely_core::Config;

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List day categories and the weekdays assigned to them
    List,
    /// Create a day category
    Add {
        name: String,
        /// Display color, e.g. "#22c55e"
        #[arg(long)]
        color: Option<String>,
    },
    /// Rename a day category
    Rename { id: String, name: String },
    /// Delete a custom day category; its weekdays revert to the built-ins
    Remove { id: String },
    /// Assign a weekday (mon..sun) to a category
    Assign { day: Weekday, id: String },
}

pub fn run(action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let categories = &mut config.context.day_categories;

    match action {
        CategoryAction::List => {
            for category in &categories.categories {
                let days: Vec<&str> = categories
                    .weekdays_in(&category.id)
                    .into_iter()
                    .map(weekday_key)
                    .collect();
                let builtin = if category.is_builtin { " (built-in)" } else { "" };
                println!("{}  {}{}  [{}]", category.id, category.name, builtin, days.join(", "));
            }
            return Ok(());
        }
        CategoryAction::Add { name, color } => {
            let id = categories.add_category(&name, color)?;
            println!("Category created: {id}");
        }
        CategoryAction::Rename { id, name } => {
            categories.rename_category(&id, &name)?;
            println!("Category renamed: {id}");
        }
        CategoryAction::Remove { id } => {
            let removed = categories.delete_category(&id)?;
            println!("Category deleted: {}", removed.name);
        }
        CategoryAction::Assign { day, id } => {
            categories.assign(day, &id)?;
            println!("{} -> {id}", weekday_key(day));
        }
    }
    config.save()?;
    Ok(())
}
