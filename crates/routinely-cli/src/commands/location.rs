use clap::Subcommand;
use routinely_core::{Config, Coordinate, LocationKind, SavedLocation};

#[derive(Subcommand)]
pub enum LocationAction {
    /// List saved locations
    List,
    /// Save a location (replaces one with the same ID)
    Add {
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// home, office, gym, school or custom
        #[arg(long, default_value = "custom")]
        kind: LocationKind,
        /// Geofence radius in meters
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Delete a saved location
    Remove { id: String },
}

pub fn run(action: LocationAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let locations = &mut config.context.locations;

    match action {
        LocationAction::List => {
            return super::print_json(&locations.locations);
        }
        LocationAction::Add {
            name,
            lat,
            lon,
            kind,
            radius,
        } => {
            let mut location = SavedLocation::new(name, kind, Coordinate::new(lat, lon)?);
            if let Some(radius) = radius {
                location = location.with_radius(radius);
            }
            let id = location.id.clone();
            locations.add(location)?;
            println!("Location saved: {id}");
        }
        LocationAction::Remove { id } => match locations.remove(&id) {
            Some(removed) => println!("Location deleted: {}", removed.name),
            None => return Err(format!("location not found: {id}").into()),
        },
    }
    config.save()?;
    Ok(())
}
