//! Last-known-location tracking.
//!
//! The device layer pushes fixes (or failures) in; the classifier reads the
//! last good fix out. Failures never clear a previous fix.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::location::{Coordinate, LocationSettings, SavedLocation};
use crate::error::{CoreError, LocationError};
use crate::reporting::{ErrorReporter, TracingReporter};

/// One callback from the location boundary.
pub type LocationUpdate = Result<Coordinate, LocationError>;

pub struct LocationMonitor {
    last_fix: Option<(Coordinate, DateTime<Utc>)>,
    last_error: Option<LocationError>,
    reporter: Arc<dyn ErrorReporter>,
}

impl Default for LocationMonitor {
    fn default() -> Self {
        Self::new(Arc::new(TracingReporter))
    }
}

impl std::fmt::Debug for LocationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationMonitor")
            .field("last_fix", &self.last_fix)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl LocationMonitor {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            last_fix: None,
            last_error: None,
            reporter,
        }
    }

    pub fn handle(&mut self, update: LocationUpdate, at: DateTime<Utc>) {
        match update {
            Ok(coordinate) => {
                self.last_fix = Some((coordinate, at));
                self.last_error = None;
            }
            Err(err) => {
                self.reporter
                    .report("location update", &CoreError::Location(err.clone()));
                self.last_error = Some(err);
            }
        }
    }

    pub fn last_coordinate(&self) -> Option<&Coordinate> {
        self.last_fix.as_ref().map(|(c, _)| c)
    }

    pub fn last_fix_at(&self) -> Option<DateTime<Utc>> {
        self.last_fix.as_ref().map(|(_, at)| *at)
    }

    pub fn last_error(&self) -> Option<&LocationError> {
        self.last_error.as_ref()
    }

    /// Saved location for the last good fix.
    pub fn current_location<'a>(
        &self,
        settings: &'a LocationSettings,
    ) -> Option<&'a SavedLocation> {
        self.last_coordinate().and_then(|c| settings.location_for(c))
    }
}
