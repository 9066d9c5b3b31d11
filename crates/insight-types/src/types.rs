//! Analysis types shared by the single-image and batch flows

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder shown before a record reaches a terminal status
pub const NOT_ANALYZED: &str = "Not analyzed";

/// Placeholder for a field the model reply did not contain
pub const NOT_AVAILABLE: &str = "NA";

/// Placeholder written into every field when the remote call failed
pub const ANALYSIS_ERROR: &str = "Analysis Error";

/// Which fixed prompt pair governs a single-image request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Accident,
    Prescription,
}

impl AnalysisType {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisType::Accident => "Accident Analysis",
            AnalysisType::Prescription => "Prescription Analysis",
        }
    }
}

impl std::fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisType::Accident => write!(f, "accident"),
            AnalysisType::Prescription => write!(f, "prescription"),
        }
    }
}

/// An uploaded image waiting for analysis. Not persisted.
#[derive(Debug, Clone)]
pub struct ImageTask {
    pub id: Uuid,
    /// Display label (usually the file name)
    pub label: String,
    pub bytes: Vec<u8>,
}

impl ImageTask {
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            bytes,
        }
    }
}

/// Per-image lifecycle in the batch flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Pending,
    Completed,
    Error,
}

impl RecordStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecordStatus::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Completed => "completed",
            RecordStatus::Error => "error",
        }
    }
}

/// The five fields extracted from an accident-scene reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccidentFields {
    pub vehicles_involved: String,
    pub accident_details: String,
    pub surroundings: String,
    pub condition: String,
    pub overall_assessment: String,
}

/// One table row of the batch flow.
///
/// Records move between statuses by being replaced whole; fields are never
/// filled in one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccidentRecord {
    pub vehicles_involved: String,
    pub accident_details: String,
    pub surroundings: String,
    pub condition: String,
    pub overall_assessment: String,
    pub status: RecordStatus,
}

impl Default for AccidentRecord {
    fn default() -> Self {
        Self::pending()
    }
}

impl AccidentRecord {
    pub fn pending() -> Self {
        Self::filled_with(NOT_ANALYZED, RecordStatus::Pending)
    }

    pub fn failed() -> Self {
        Self::filled_with(ANALYSIS_ERROR, RecordStatus::Error)
    }

    pub fn completed(fields: AccidentFields) -> Self {
        Self {
            vehicles_involved: fields.vehicles_involved,
            accident_details: fields.accident_details,
            surroundings: fields.surroundings,
            condition: fields.condition,
            overall_assessment: fields.overall_assessment,
            status: RecordStatus::Completed,
        }
    }

    fn filled_with(value: &str, status: RecordStatus) -> Self {
        Self {
            vehicles_involved: value.to_string(),
            accident_details: value.to_string(),
            surroundings: value.to_string(),
            condition: value.to_string(),
            overall_assessment: value.to_string(),
            status,
        }
    }
}

/// One analyzed image in a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub image: String,
    #[serde(flatten)]
    pub record: AccidentRecord,
}

/// Batch analysis results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResults {
    pub entries: Vec<BatchEntry>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl BatchResults {
    pub fn new(
        entries: Vec<BatchEntry>,
        started_at: chrono::DateTime<chrono::Utc>,
        completed_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let count = |status: RecordStatus| entries.iter().filter(|e| e.record.status == status).count();
        let completed = count(RecordStatus::Completed);
        let failed = count(RecordStatus::Error);
        Self {
            total: entries.len(),
            completed,
            failed,
            entries,
            started_at,
            completed_at,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}
