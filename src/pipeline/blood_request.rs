use super::extraction::prompt::blood_request_prompt;
use super::extraction::{normalize_blood_request, sanitize_user_text, BloodRequestDraft, ExtractionError};
use super::model::{GenerativeModel, ModelRequest};
use super::{generate_json, PipelineError};

/// Pull blood-request form fields out of a free-text description.
pub async fn extract_blood_request(
    model: &dyn GenerativeModel,
    text: &str,
) -> Result<BloodRequestDraft, PipelineError> {
    let cleaned = sanitize_user_text(text);
    if cleaned.is_empty() {
        return Err(ExtractionError::InvalidInput("text is required".into()).into());
    }

    let request = ModelRequest::text(blood_request_prompt(&cleaned));
    let value = generate_json(model, &request).await?;
    let draft = normalize_blood_request(&value)?;

    tracing::info!(
        blood_group = draft.blood_group.map(|g| g.as_str()).unwrap_or("unknown"),
        has_location = draft.location.is_some(),
        "Blood request extracted"
    );
    Ok(draft)
}
