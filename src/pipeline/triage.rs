use super::extraction::prompt::triage_prompt;
use super::extraction::{normalize_triage, sanitize_user_text, ExtractionError, TriageResult};
use super::model::{GenerativeModel, ModelRequest};
use super::{generate_json, PipelineError};

/// Suggest a specialty and urgency for free-text symptoms.
pub async fn triage_symptoms(
    model: &dyn GenerativeModel,
    symptoms: &str,
) -> Result<TriageResult, PipelineError> {
    let cleaned = sanitize_user_text(symptoms);
    if cleaned.is_empty() {
        return Err(ExtractionError::InvalidInput("symptoms are required".into()).into());
    }

    let request = ModelRequest::text(triage_prompt(&cleaned));
    let value = generate_json(model, &request).await?;
    let result = normalize_triage(&value)?;

    tracing::info!(
        specialty = %result.specialty,
        urgency = result.urgency.as_str(),
        "Symptoms triaged"
    );
    Ok(result)
}
