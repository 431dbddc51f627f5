//! Side channel for errors that must not interrupt the caller.
//!
//! Location and persistence failures are handed to an [`ErrorReporter`];
//! the operation that hit them carries on with default or previous data.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Broad origin of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Location,
    Persistence,
    Validation,
    RoutineState,
    Other,
}

impl ErrorOrigin {
    pub fn of(error: &CoreError) -> Self {
        match error {
            CoreError::Location(_) => ErrorOrigin::Location,
            CoreError::Database(_)
            | CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => ErrorOrigin::Persistence,
            CoreError::Validation(_) => ErrorOrigin::Validation,
            CoreError::RoutineState(_) => ErrorOrigin::RoutineState,
            CoreError::Export(_) => ErrorOrigin::Persistence,
            CoreError::Companion(_) | CoreError::Custom(_) => ErrorOrigin::Other,
        }
    }
}

/// What a UI should offer the user for a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    OpenSettings,
    Ignore,
    Restart,
}

/// A reported error, flattened for display and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub origin: ErrorOrigin,
    pub operation: String,
    pub message: String,
    pub actions: Vec<RecoveryAction>,
}

impl ErrorReport {
    pub fn new(operation: &str, error: &CoreError) -> Self {
        Self {
            origin: ErrorOrigin::of(error),
            operation: operation.to_string(),
            message: error.to_string(),
            actions: recovery_actions(error),
        }
    }
}

/// Recovery options for an error. State-corrupting errors ask for a restart.
pub fn recovery_actions(error: &CoreError) -> Vec<RecoveryAction> {
    use crate::error::{DatabaseError, LocationError};

    match error {
        CoreError::Location(LocationError::PermissionDenied) => {
            vec![RecoveryAction::OpenSettings, RecoveryAction::Ignore]
        }
        CoreError::Location(_) => vec![RecoveryAction::Retry, RecoveryAction::Ignore],
        CoreError::Database(DatabaseError::CorruptedRecord { .. })
        | CoreError::Database(DatabaseError::MigrationFailed(_)) => vec![RecoveryAction::Restart],
        CoreError::Database(DatabaseError::StorageFull) => {
            vec![RecoveryAction::OpenSettings, RecoveryAction::Ignore]
        }
        CoreError::Database(_) | CoreError::Io(_) | CoreError::Json(_) => {
            vec![RecoveryAction::Retry, RecoveryAction::Ignore]
        }
        CoreError::Config(_) => vec![RecoveryAction::OpenSettings, RecoveryAction::Ignore],
        CoreError::Companion(_) => vec![RecoveryAction::Retry, RecoveryAction::Ignore],
        CoreError::Export(_) => vec![RecoveryAction::Ignore],
        CoreError::Validation(_) | CoreError::RoutineState(_) | CoreError::Custom(_) => {
            vec![RecoveryAction::Ignore]
        }
    }
}

pub trait ErrorReporter: Send + Sync {
    fn report(&self, operation: &str, error: &CoreError);
}

/// Logs reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, operation: &str, error: &CoreError) {
        let report = ErrorReport::new(operation, error);
        tracing::warn!(
            origin = ?report.origin,
            operation = %report.operation,
            actions = ?report.actions,
            "{}",
            report.message
        );
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, operation: &str, error: &CoreError) {
        let report = ErrorReport::new(operation, error);
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DatabaseError, LocationError};

    #[test]
    fn permission_denied_offers_settings() {
        let err = CoreError::from(LocationError::PermissionDenied);
        assert_eq!(
            recovery_actions(&err),
            vec![RecoveryAction::OpenSettings, RecoveryAction::Ignore]
        );
    }

    #[test]
    fn corrupted_record_asks_for_restart() {
        let err = CoreError::from(DatabaseError::CorruptedRecord {
            key: "template:1".into(),
            message: "bad json".into(),
        });
        assert_eq!(recovery_actions(&err), vec![RecoveryAction::Restart]);
        assert_eq!(ErrorOrigin::of(&err), ErrorOrigin::Persistence);
    }

    #[test]
    fn collecting_reporter_keeps_reports() {
        let reporter = CollectingReporter::new();
        reporter.report("location", &LocationError::Unavailable.into());
        reporter.report("save", &DatabaseError::Locked.into());
        let reports = reporter.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].origin, ErrorOrigin::Location);
        assert_eq!(reports[1].operation, "save");
    }
}
