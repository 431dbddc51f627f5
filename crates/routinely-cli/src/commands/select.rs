use clap::Args;
use routinely_core::{Config, Database, RoutineSelector};
use serde_json::json;

use super::WhereWhen;

#[derive(Args)]
pub struct SelectArgs {
    #[command(flatten)]
    pub place: WhereWhen,
    /// Start the selected routine (implied by `selection.auto_select`)
    #[arg(long)]
    pub start: bool,
    /// Show every eligible template with its score
    #[arg(long)]
    pub ranked: bool,
}

pub fn run(args: SelectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let templates = db.list_templates()?;
    let context = args.place.classify(&config.context)?;
    let selector = RoutineSelector::new();

    if args.ranked {
        let ranked: Vec<_> = selector
            .ranked(&templates, &context)
            .into_iter()
            .map(|c| json!({ "id": c.template.id, "name": c.template.name, "score": c.score }))
            .collect();
        return super::print_json(&json!({ "context": context, "ranked": ranked }));
    }

    let selection = selector.select(&templates, &context);
    let mut out = json!({
        "context": context,
        "template_id": selection.template.map(|t| t.id.clone()),
        "template_name": selection.template.map(|t| t.name.clone()),
        "score": selection.score,
        "source": selection.source,
    });
    if config.selection.show_reason {
        out["reason"] = json!(selection.reason);
    }

    if args.start || config.selection.auto_select {
        if let Some(template) = selection.template {
            let event = super::session::start_template(&db, template.clone())?;
            out["started"] = serde_json::to_value(&event)?;
        }
    }
    super::print_json(&out)
}
