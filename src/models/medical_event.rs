use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{EventType, Severity};

/// A medical event ready to be stored. Built from a normalized
/// extraction plus the caller's identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMedicalEvent {
    pub patient_id: String,
    pub uploader_id: String,
    pub title: String,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub severity: Severity,
    pub summary: Option<String>,
    pub extracted_text: Option<String>,
    pub key_findings: Vec<String>,
    pub attachment_urls: Vec<String>,
    /// Full model output, kept for audit.
    pub ai_details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalEventRecord {
    pub id: Uuid,
    pub patient_id: String,
    pub uploader_id: String,
    pub title: String,
    pub event_type: EventType,
    pub event_date: NaiveDate,
    pub severity: Severity,
    pub summary: Option<String>,
    pub extracted_text: Option<String>,
    pub key_findings: Vec<String>,
    pub attachment_urls: Vec<String>,
    pub ai_details: serde_json::Value,
    pub created_at: NaiveDateTime,
}
