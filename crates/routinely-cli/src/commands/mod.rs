pub mod category;
pub mod companion;
pub mod config;
pub mod context;
pub mod export;
pub mod location;
pub mod select;
pub mod session;
pub mod template;

use chrono::{DateTime, Local};
use clap::Args;
use routinely_core::{ContextClassifier, ContextSettings, Coordinate, RoutineContext};
use serde::Serialize;

/// Where and when to classify. Defaults to now, location unknown.
#[derive(Args, Debug, Clone, Default)]
pub struct WhereWhen {
    /// Latitude of the current position
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    /// Longitude of the current position
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
    /// Classify this instant instead of now (RFC 3339, e.g. 2024-03-04T07:45:00+02:00)
    #[arg(long)]
    pub at: Option<String>,
}

impl WhereWhen {
    pub fn coordinate(&self) -> Result<Option<Coordinate>, Box<dyn std::error::Error>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon)?)),
            _ => Ok(None),
        }
    }

    pub fn classify(
        &self,
        settings: &ContextSettings,
    ) -> Result<RoutineContext, Box<dyn std::error::Error>> {
        let classifier = ContextClassifier::new(settings.clone());
        let coordinate = self.coordinate()?;
        let context = match &self.at {
            Some(at) => {
                let at = DateTime::parse_from_rfc3339(at)?;
                classifier.classify(&at, coordinate.as_ref())
            }
            None => classifier.classify(&Local::now(), coordinate.as_ref()),
        };
        Ok(context)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
