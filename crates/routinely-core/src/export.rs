//! Portable backup of templates, answers and context settings.
//!
//! A bundle is a JSON document with a SHA-256 checksum over everything
//! else in it. The checksum is computed on the canonical (sorted-key)
//! JSON form, so pretty-printing or key order on disk does not matter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::ContextSettings;
use crate::error::CoreError;
use crate::habit::ConditionalResponse;
use crate::storage::Database;
use crate::template::RoutineTemplate;

pub const FORMAT_VERSION: u32 = 1;

const CHECKSUM_FIELD: &str = "checksum";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Malformed export bundle: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported export format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u64, supported: u32 },

    #[error("Export bundle has no checksum")]
    MissingChecksum,

    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub templates: Vec<RoutineTemplate>,
    #[serde(default)]
    pub responses: Vec<ConditionalResponse>,
    #[serde(default)]
    pub settings: ContextSettings,
    pub checksum: String,
}

/// What an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub templates: usize,
    pub responses: usize,
}

impl ExportBundle {
    /// # Errors
    /// Returns an error if the contents cannot be serialized.
    pub fn new(
        templates: Vec<RoutineTemplate>,
        responses: Vec<ConditionalResponse>,
        settings: ContextSettings,
    ) -> Result<Self, ExportError> {
        let mut bundle = Self {
            format_version: FORMAT_VERSION,
            exported_at: Utc::now(),
            templates,
            responses,
            settings,
            checksum: String::new(),
        };
        bundle.checksum = checksum_of(serde_json::to_value(&bundle)?);
        Ok(bundle)
    }

    /// Everything stored in `db`, plus the given context settings.
    ///
    /// # Errors
    /// Returns an error if reading the database fails.
    pub fn from_database(db: &Database, settings: ContextSettings) -> Result<Self, CoreError> {
        Ok(Self::new(db.list_templates()?, db.list_responses(None)?, settings)?)
    }

    /// # Errors
    /// Returns an error if the bundle cannot be serialized.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and verify a bundle.
    ///
    /// # Errors
    /// Fails for malformed JSON, an unknown format version, or a checksum
    /// that does not match the contents.
    pub fn from_json(text: &str) -> Result<Self, ExportError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let version = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        if version != u64::from(FORMAT_VERSION) {
            return Err(ExportError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let expected = value
            .get(CHECKSUM_FIELD)
            .and_then(serde_json::Value::as_str)
            .ok_or(ExportError::MissingChecksum)?
            .to_string();
        let actual = checksum_of(value.clone());
        if expected != actual {
            return Err(ExportError::ChecksumMismatch { expected, actual });
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Write the bundle's templates and answers into `db`.
    ///
    /// Records with an existing id are replaced. Settings are left to the
    /// caller, since they live in the config file.
    ///
    /// # Errors
    /// Returns the first validation or database error.
    pub fn import_into(&self, db: &Database) -> Result<ImportSummary, CoreError> {
        for template in &self.templates {
            db.save_template(template)?;
        }
        for response in &self.responses {
            db.record_response(response)?;
        }
        let summary = ImportSummary {
            templates: self.templates.len(),
            responses: self.responses.len(),
        };
        tracing::info!(
            templates = summary.templates,
            responses = summary.responses,
            "import finished"
        );
        Ok(summary)
    }
}

/// Hex SHA-256 of the canonical JSON of `value` without its checksum field.
fn checksum_of(mut value: serde_json::Value) -> String {
    if let Some(map) = value.as_object_mut() {
        map.remove(CHECKSUM_FIELD);
    }
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
