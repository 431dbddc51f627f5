//! Saved locations and geofence lookup.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LocationError, ValidationError};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default geofence radius for a newly saved location.
pub const DEFAULT_RADIUS_M: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// # Errors
    /// Returns [`LocationError::InvalidCoordinate`] for out-of-range or
    /// non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(LocationError::InvalidCoordinate {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance in metres (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Home,
    Office,
    Gym,
    School,
    Custom,
}

impl LocationKind {
    /// Id used for the well-known kinds so rules can refer to "home"
    /// without knowing a generated id.
    pub fn builtin_id(&self) -> Option<&'static str> {
        match self {
            LocationKind::Home => Some("home"),
            LocationKind::Office => Some("office"),
            LocationKind::Gym => Some("gym"),
            LocationKind::School => Some("school"),
            LocationKind::Custom => None,
        }
    }
}

impl std::str::FromStr for LocationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" => Ok(LocationKind::Home),
            "office" | "work" => Ok(LocationKind::Office),
            "gym" => Ok(LocationKind::Gym),
            "school" => Ok(LocationKind::School),
            "custom" => Ok(LocationKind::Custom),
            other => Err(ValidationError::UnknownId {
                kind: "location kind".into(),
                id: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
    pub coordinate: Coordinate,
    #[serde(default = "default_radius")]
    pub radius_m: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_M
}

impl SavedLocation {
    pub fn new(name: impl Into<String>, kind: LocationKind, coordinate: Coordinate) -> Self {
        let id = kind
            .builtin_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            id,
            name: name.into(),
            kind,
            coordinate,
            radius_m: DEFAULT_RADIUS_M,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = radius_m;
        self
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        self.coordinate.distance_m(point) <= self.radius_m
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSettings {
    #[serde(default)]
    pub locations: Vec<SavedLocation>,
}

impl LocationSettings {
    /// Save a location. A built-in kind replaces the existing entry with
    /// the same id.
    pub fn add(&mut self, location: SavedLocation) -> Result<(), ValidationError> {
        if location.name.trim().is_empty() {
            return Err(ValidationError::invalid("name", "must not be empty"));
        }
        if !(location.radius_m.is_finite() && location.radius_m > 0.0) {
            return Err(ValidationError::invalid("radius_m", "must be positive"));
        }
        match self.locations.iter_mut().find(|l| l.id == location.id) {
            Some(existing) => *existing = location,
            None => self.locations.push(location),
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<SavedLocation> {
        let idx = self.locations.iter().position(|l| l.id == id)?;
        Some(self.locations.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&SavedLocation> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// First saved location, in list order, whose radius contains `point`.
    ///
    /// Overlapping geofences are not ranked by distance; the earlier entry
    /// wins.
    pub fn location_for(&self, point: &Coordinate) -> Option<&SavedLocation> {
        self.locations.iter().find(|l| l.contains(point))
    }
}
