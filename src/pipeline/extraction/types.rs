use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::enums::{BloodGroup, EventType, RequestUrgency, Severity, TriageUrgency};

/// Title used when the model does not name the document.
pub const DEFAULT_TITLE: &str = "Medical Document";

/// Normalized result of reading one medical document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub title: String,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub severity: Severity,
    pub summary: Option<String>,
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicine_safety_check: Option<String>,
}

/// Outcome of symptom triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub condition: String,
    /// Upper-snake specialty name, e.g. `GENERAL_PHYSICIAN`.
    pub specialty: String,
    pub urgency: TriageUrgency,
    pub advice: String,
    pub reasoning: String,
}

/// Blood request fields pulled out of a free-text description.
/// Every field is optional; the form is completed by the requester.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BloodRequestDraft {
    pub blood_group: Option<BloodGroup>,
    pub location: Option<String>,
    pub patient_note: Option<String>,
    pub urgency: Option<RequestUrgency>,
}
