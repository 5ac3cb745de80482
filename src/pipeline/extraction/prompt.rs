//! Fixed instruction prompts sent with each model call.

/// Quick analysis of an uploaded report image (not persisted).
pub const ANALYZE_REPORT_PROMPT: &str = "\
Analyze this medical report. Return strictly valid JSON.
Fields: title, event_type (REPORT/PRESCRIPTION/SURGERY), event_date (YYYY-MM-DD), \
severity (HIGH/MEDIUM/LOW), summary.
Do not use Markdown code blocks.";

/// Full OCR + analysis of a report or prescription that will be stored.
pub const PROCESS_REPORT_PROMPT: &str = r#"
Role: Expert Medical AI.
Task:
1. EXTRACT every single word (OCR).
2. Identify Document Type: REPORT, PRESCRIPTION or SURGERY.
3. Analyze findings. If Prescription, check for common contraindications.

Output JSON format (Strictly):
{
  "title": "Short descriptive title",
  "event_type": "REPORT" or "PRESCRIPTION" or "SURGERY",
  "event_date": "YYYY-MM-DD",
  "severity": "HIGH/MEDIUM/LOW",
  "summary": "Concise summary.",
  "extracted_text": "Full text content...",
  "key_findings": ["Hb: 10.5 (Low)", "Platelets: Normal"],
  "medicine_safety_check": "Safe/Caution/Danger (Only for prescriptions)"
}
"#;

const TRIAGE_TEMPLATE: &str = r#"
Role: Professional Medical Triage Nurse.
Input Symptoms: "{symptoms}"

Task: Analyze the symptoms and suggest the correct specialist.

Output Format: JSON ONLY (No markdown, no extra text).
{
  "condition": "Brief possible condition (e.g., Migraine)",
  "specialty": "Standard Medical Specialty (e.g., NEUROLOGIST, CARDIOLOGIST, DENTIST, GENERAL_PHYSICIAN)",
  "urgency": "HIGH/MEDIUM/LOW",
  "advice": "One line immediate advice (e.g., Rest in a dark room)",
  "reasoning": "Why this specialty?"
}
"#;

const BLOOD_REQUEST_TEMPLATE: &str = r#"
Role: Blood bank coordinator.
Input: "{text}"

Task: Extract the blood request details from the input.

Output Format: JSON ONLY (No markdown, no extra text).
{
  "blood_group": "One of A+, A-, B+, B-, AB+, AB-, O+, O- or null",
  "location": "Hospital or place name, or null",
  "patient_note": "Short note about the patient or reason, or null",
  "urgency": "NORMAL or CRITICAL"
}
"#;

/// Build the triage prompt. `symptoms` must already be sanitized.
pub fn triage_prompt(symptoms: &str) -> String {
    TRIAGE_TEMPLATE.replace("{symptoms}", &quote_safe(symptoms))
}

/// Build the blood-request extraction prompt. `text` must already be sanitized.
pub fn blood_request_prompt(text: &str) -> String {
    BLOOD_REQUEST_TEMPLATE.replace("{text}", &quote_safe(text))
}

/// The user text sits inside double quotes in the template.
fn quote_safe(text: &str) -> String {
    text.replace('"', "'")
}
