//! Report analysis (read-only) and report processing (analysis plus a
//! duplicate-safe insert of the resulting medical event).

use chrono::NaiveDate;

use super::extraction::prompt::{ANALYZE_REPORT_PROMPT, PROCESS_REPORT_PROMPT};
use super::extraction::{normalize_report, prepare_inline_image, ExtractionError, ExtractionResult};
use super::model::{GenerativeModel, ModelRequest};
use super::{generate_json, PipelineError};
use crate::db::MedicalEventStore;
use crate::models::{MedicalEventRecord, NewMedicalEvent};

/// An uploaded document image as received from the caller.
#[derive(Debug, Clone)]
pub struct ReportImage<'a> {
    pub image_base64: &'a str,
    pub mime_type: Option<&'a str>,
}

/// Caller identifiers attached to a persisted report.
#[derive(Debug, Clone)]
pub struct ReportOwner<'a> {
    pub patient_id: &'a str,
    pub uploader_id: &'a str,
    pub file_url: &'a str,
}

impl ReportOwner<'_> {
    fn validate(&self) -> Result<(), ExtractionError> {
        for (name, value) in [
            ("patient_id", self.patient_id),
            ("uploader_id", self.uploader_id),
            ("file_url", self.file_url),
        ] {
            if value.trim().is_empty() {
                return Err(ExtractionError::InvalidInput(format!("{name} is required")));
            }
        }
        Ok(())
    }
}

/// A stored report: the normalized extraction and the event row made from it.
#[derive(Debug, Clone)]
pub struct ProcessedReport {
    pub extraction: ExtractionResult,
    pub record: MedicalEventRecord,
}

/// Analyze a report image and return the normalized extraction.
/// Nothing is stored.
pub async fn analyze_report(
    model: &dyn GenerativeModel,
    image: &ReportImage<'_>,
    today: NaiveDate,
) -> Result<ExtractionResult, PipelineError> {
    let inline = prepare_inline_image(image.image_base64, image.mime_type)?;
    let request = ModelRequest::with_image(ANALYZE_REPORT_PROMPT, inline);
    let value = generate_json(model, &request).await?;
    let result = normalize_report(&value, today)?;

    tracing::info!(
        event_type = result.event_type.as_str(),
        severity = result.severity.as_str(),
        "Report analyzed"
    );
    Ok(result)
}

/// Analyze a report image and store it as a medical event.
///
/// The insert goes straight to the store; a record with the same
/// `(patient_id, title, event_date)` makes it fail with
/// [`crate::db::StoreError::Duplicate`], which callers report as a conflict.
pub async fn process_report(
    model: &dyn GenerativeModel,
    store: &dyn MedicalEventStore,
    image: &ReportImage<'_>,
    owner: &ReportOwner<'_>,
    today: NaiveDate,
) -> Result<ProcessedReport, PipelineError> {
    owner.validate()?;
    let inline = prepare_inline_image(image.image_base64, image.mime_type)?;
    let request = ModelRequest::with_image(PROCESS_REPORT_PROMPT, inline);
    let raw = generate_json(model, &request).await?;
    let result = normalize_report(&raw, today)?;

    let event = NewMedicalEvent {
        patient_id: owner.patient_id.to_string(),
        uploader_id: owner.uploader_id.to_string(),
        title: result.title.clone(),
        event_type: result.event_type,
        event_date: result.event_date,
        severity: result.severity,
        summary: result.summary.clone(),
        extracted_text: result.extracted_text.clone(),
        key_findings: result.key_findings.clone(),
        attachment_urls: vec![owner.file_url.to_string()],
        ai_details: raw,
    };

    let record = store.insert_event(&event).await?;
    tracing::info!(
        event_id = %record.id,
        event_type = record.event_type.as_str(),
        event_date = %record.event_date,
        "Medical event stored"
    );
    Ok(ProcessedReport {
        extraction: result,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteStore, StoreError};
    use crate::models::{EventType, Severity};
    use crate::pipeline::model::MockModel;

    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn image() -> ReportImage<'static> {
        ReportImage {
            image_base64: PNG_B64,
            mime_type: Some("image/png"),
        }
    }

    fn owner() -> ReportOwner<'static> {
        ReportOwner {
            patient_id: "patient-1",
            uploader_id: "uploader-1",
            file_url: "https://files.test/report.png",
        }
    }

    #[tokio::test]
    async fn analyze_strips_fences_and_normalizes() {
        let model = MockModel::new(
            "```json\n{\"title\":\"CBC\",\"event_type\":\"report\",\"event_date\":\"2026-01-02\",\"severity\":\"MEDIUM\",\"summary\":\"Low Hb\"}\n```",
        );
        let result = analyze_report(&model, &image(), today()).await.unwrap();
        assert_eq!(result.title, "CBC");
        assert_eq!(result.event_type, EventType::Report);
        assert_eq!(result.severity, Severity::Medium);
        assert_eq!(result.summary.as_deref(), Some("Low Hb"));

        let sent = model.last_request().unwrap();
        assert_eq!(sent.prompt, ANALYZE_REPORT_PROMPT);
        assert_eq!(sent.image.unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn invalid_image_rejected_before_model_call() {
        let model = MockModel::new("{}");
        let bad = ReportImage {
            image_base64: "not base64 !!",
            mime_type: None,
        };
        let err = analyze_report(&model, &bad, today()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::InvalidImage(_))));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn prose_answer_is_malformed() {
        let model = MockModel::new("I could not read this document.");
        let err = analyze_report(&model, &image(), today()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn missing_title_and_date_defaulted_in_stored_record() {
        let model = MockModel::new("{\"severity\":\"HIGH\",\"key_findings\":[\"Hb: 9.1 (Low)\"]}");
        let store = SqliteStore::open_in_memory().unwrap();

        let processed = process_report(&model, &store, &image(), &owner(), today())
            .await
            .unwrap();
        assert_eq!(processed.extraction.title, "Medical Document");
        let record = processed.record;
        assert_eq!(record.title, "Medical Document");
        assert_eq!(record.event_date, today());
        assert_eq!(record.event_type, EventType::Report);
        assert_eq!(record.severity, Severity::High);
        assert_eq!(record.attachment_urls, vec!["https://files.test/report.png"]);
        assert_eq!(record.ai_details["key_findings"][0], "Hb: 9.1 (Low)");
    }

    #[tokio::test]
    async fn prose_wrapped_object_is_malformed() {
        let model = MockModel::new("Sure! Here you go: {\"title\":\"CBC\"} Let me know.");
        let err = analyze_report(&model, &image(), today()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn processed_report_keeps_prescription_safety_check() {
        let model = MockModel::new(
            "{\"title\":\"Prescription\",\"event_type\":\"PRESCRIPTION\",\"event_date\":\"2026-09-30\",\"medicine_safety_check\":\"Caution\"}",
        );
        let store = SqliteStore::open_in_memory().unwrap();

        let processed = process_report(&model, &store, &image(), &owner(), today())
            .await
            .unwrap();
        assert_eq!(processed.extraction.medicine_safety_check.as_deref(), Some("Caution"));
        assert_eq!(processed.extraction.event_type, EventType::Prescription);
        assert_eq!(processed.record.title, "Prescription");
    }

    #[tokio::test]
    async fn second_identical_report_is_duplicate() {
        let model = MockModel::new("{\"title\":\"X-Ray\",\"event_date\":\"2026-03-01\"}");
        let store = SqliteStore::open_in_memory().unwrap();

        process_report(&model, &store, &image(), &owner(), today())
            .await
            .unwrap();
        let err = process_report(&model, &store, &image(), &owner(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn invalid_enum_persists_nothing() {
        let model = MockModel::new("{\"title\":\"Scan\",\"severity\":\"CATASTROPHIC\"}");
        let store = SqliteStore::open_in_memory().unwrap();

        let err = process_report(&model, &store, &image(), &owner(), today())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::InvalidField { .. })));
        let found = store
            .find_event("patient-1", "Scan", today())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn missing_patient_id_rejected_before_model_call() {
        let model = MockModel::new("{}");
        let store = SqliteStore::open_in_memory().unwrap();
        let owner = ReportOwner {
            patient_id: " ",
            ..owner()
        };
        let err = process_report(&model, &store, &image(), &owner, today())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::InvalidInput(_))));
        assert_eq!(model.calls(), 0);
    }
}
