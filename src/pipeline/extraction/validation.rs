use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::types::{BloodRequestDraft, ExtractionResult, TriageResult, DEFAULT_TITLE};
use super::ExtractionError;
use crate::models::enums::{BloodGroup, EventType, RequestUrgency, Severity};

type Object = Map<String, Value>;

/// Validate a parsed report extraction and apply defaults.
///
/// Absent or null fields fall back to: title `"Medical Document"`,
/// `event_date` = `today`, event type `REPORT`, severity `LOW`, no findings.
/// A field that is present but has the wrong type or an unknown value
/// rejects the whole response.
pub fn normalize_report(value: &Value, today: NaiveDate) -> Result<ExtractionResult, ExtractionError> {
    let obj = as_object(value)?;

    let title = optional_string(obj, "title")?.unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let event_type = optional_enum::<EventType>(obj, "event_type")?.unwrap_or_default();
    let severity = optional_enum::<Severity>(obj, "severity")?.unwrap_or_default();
    let event_date = optional_date(obj, "event_date")?.unwrap_or(today);

    Ok(ExtractionResult {
        title,
        event_type,
        event_date,
        severity,
        summary: optional_string(obj, "summary")?,
        extracted_text: optional_string(obj, "extracted_text")?,
        key_findings: optional_string_list(obj, "key_findings")?,
        medicine_safety_check: optional_string(obj, "medicine_safety_check")?,
    })
}

/// Validate a triage answer. `specialty` and `urgency` are required; the
/// descriptive fields default to empty text.
pub fn normalize_triage(value: &Value) -> Result<TriageResult, ExtractionError> {
    let obj = as_object(value)?;

    let specialty = optional_string(obj, "specialty")?
        .map(|s| normalize_specialty(&s))
        .filter(|s| !s.is_empty())
        .ok_or(ExtractionError::MissingField("specialty"))?;
    let urgency = optional_enum::<Severity>(obj, "urgency")?
        .ok_or(ExtractionError::MissingField("urgency"))?;

    Ok(TriageResult {
        condition: optional_string(obj, "condition")?.unwrap_or_default(),
        specialty,
        urgency,
        advice: optional_string(obj, "advice")?.unwrap_or_default(),
        reasoning: optional_string(obj, "reasoning")?.unwrap_or_default(),
    })
}

/// Validate a blood-request draft. Unknown blood groups and urgencies are
/// dropped instead of rejected so the requester can fill them in by hand.
pub fn normalize_blood_request(value: &Value) -> Result<BloodRequestDraft, ExtractionError> {
    let obj = as_object(value)?;

    let blood_group = optional_string(obj, "blood_group")?.and_then(|raw| {
        let compact: String = raw.split_whitespace().collect();
        let parsed = BloodGroup::from_str(&normalize_blood_group_words(&compact)).ok();
        if parsed.is_none() {
            tracing::debug!(value = %raw, "Dropping unrecognized blood group");
        }
        parsed
    });

    let urgency = optional_string(obj, "urgency")?.and_then(|raw| {
        RequestUrgency::from_str(&raw).ok().or_else(|| {
            let lowered = raw.to_ascii_lowercase();
            ["urgent", "emergency", "high", "immediate"]
                .iter()
                .any(|w| lowered.contains(w))
                .then_some(RequestUrgency::Critical)
        })
    });

    Ok(BloodRequestDraft {
        blood_group,
        location: optional_string(obj, "location")?,
        patient_note: optional_string(obj, "patient_note")?,
        urgency,
    })
}

// ──────────────────────────────────────────────
// Field helpers
// ──────────────────────────────────────────────

fn as_object(value: &Value) -> Result<&Object, ExtractionError> {
    value.as_object().ok_or(ExtractionError::NotAnObject)
}

/// Absent, null and blank strings are `None`; non-strings are invalid.
fn optional_string(obj: &Object, field: &'static str) -> Result<Option<String>, ExtractionError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(ExtractionError::InvalidField {
            field,
            reason: format!("expected string, got {}", json_type(other)),
        }),
    }
}

fn optional_enum<T>(obj: &Object, field: &'static str) -> Result<Option<T>, ExtractionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_string(obj, field)?
        .map(|raw| {
            T::from_str(&raw).map_err(|e| ExtractionError::InvalidField {
                field,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn optional_date(obj: &Object, field: &'static str) -> Result<Option<NaiveDate>, ExtractionError> {
    optional_string(obj, field)?
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| ExtractionError::InvalidField {
                field,
                reason: format!("expected YYYY-MM-DD, got {raw:?}"),
            })
        })
        .transpose()
}

fn optional_string_list(obj: &Object, field: &'static str) -> Result<Vec<String>, ExtractionError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(Ok(s.trim().to_string())),
                other => Some(Err(ExtractionError::InvalidField {
                    field,
                    reason: format!("expected array of strings, found {}", json_type(other)),
                })),
            })
            .collect(),
        Some(other) => Err(ExtractionError::InvalidField {
            field,
            reason: format!("expected array, got {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `General Physician` / `general-physician` → `GENERAL_PHYSICIAN`.
fn normalize_specialty(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// `Opos` / `ABnegative` → `O+` / `AB-`.
fn normalize_blood_group_words(compact: &str) -> String {
    let upper = compact.to_ascii_uppercase();
    for (suffix, sign) in [("POSITIVE", "+"), ("NEGATIVE", "-"), ("POS", "+"), ("NEG", "-")] {
        if let Some(base) = upper.strip_suffix(suffix) {
            return format!("{base}{sign}");
        }
    }
    upper
}
