use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DonorDirectory, MedicalEventStore, StoreError};
use crate::models::{
    BloodGroup, DonorContact, EventType, MedicalEventRecord, NewMedicalEvent, Severity,
};

/// SQLSTATE for unique_violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Managed-database backend speaking the PostgREST protocol with a
/// service-role key.
pub struct PostgrestStore {
    rest_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl PostgrestStore {
    /// `base_url` is the project URL (`https://<ref>.supabase.co`) or the
    /// REST root itself (`…/rest/v1`).
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let trimmed = base_url.trim_end_matches('/');
        let rest_url = if trimmed.ends_with("/rest/v1") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/rest/v1")
        };

        Ok(Self {
            rest_url,
            service_key: service_key.to_string(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        // 409 also covers foreign-key and other constraint failures.
        let code = serde_json::from_str::<PostgrestErrorBody>(&body)
            .ok()
            .and_then(|e| e.code);
        if code.as_deref() == Some(PG_UNIQUE_VIOLATION) {
            return Err(StoreError::Duplicate);
        }
        Err(StoreError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn insert_event_inner(&self, event: &NewMedicalEvent) -> Result<MedicalEventRecord, StoreError> {
        let row = InsertRow {
            id: Uuid::new_v4(),
            event,
        };
        let response = self
            .send(
                self.client
                    .post(self.table_url("medical_events"))
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await?;

        let mut rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
        let inserted = rows
            .pop()
            .ok_or_else(|| StoreError::ResponseParsing("insert returned no rows".into()))?;
        Ok(inserted.into_record())
    }

    async fn available_donors_inner(&self, blood_group: BloodGroup) -> Result<Vec<DonorContact>, StoreError> {
        let response = self
            .send(self.client.get(self.table_url("blood_donors")).query(&[
                ("select", "user_id,profiles!inner(fcm_token)".to_string()),
                ("blood_group", format!("eq.{}", blood_group.as_str())),
                ("availability", "eq.true".to_string()),
            ]))
            .await?;

        let rows: Vec<DonorRow> = response
            .json()
            .await
            .map_err(|e| StoreError::ResponseParsing(e.to_string()))?;
        Ok(rows.into_iter().map(DonorRow::into_contact).collect())
    }
}

impl MedicalEventStore for PostgrestStore {
    fn insert_event<'a>(
        &'a self,
        event: &'a NewMedicalEvent,
    ) -> BoxFuture<'a, Result<MedicalEventRecord, StoreError>> {
        self.insert_event_inner(event).boxed()
    }
}

impl DonorDirectory for PostgrestStore {
    fn available_donors(
        &self,
        blood_group: BloodGroup,
    ) -> BoxFuture<'_, Result<Vec<DonorContact>, StoreError>> {
        self.available_donors_inner(blood_group).boxed()
    }
}

// ──────────────────────────────────────────────
// Wire rows
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct PostgrestErrorBody {
    code: Option<String>,
}

#[derive(Serialize)]
struct InsertRow<'a> {
    id: Uuid,
    #[serde(flatten)]
    event: &'a NewMedicalEvent,
}

#[derive(Deserialize)]
struct EventRow {
    id: Uuid,
    patient_id: String,
    uploader_id: String,
    title: String,
    event_type: EventType,
    event_date: NaiveDate,
    severity: Severity,
    summary: Option<String>,
    extracted_text: Option<String>,
    #[serde(default)]
    key_findings: Option<Vec<String>>,
    #[serde(default)]
    attachment_urls: Option<Vec<String>>,
    #[serde(default)]
    ai_details: serde_json::Value,
    created_at: Option<DateTime<FixedOffset>>,
}

impl EventRow {
    fn into_record(self) -> MedicalEventRecord {
        MedicalEventRecord {
            id: self.id,
            patient_id: self.patient_id,
            uploader_id: self.uploader_id,
            title: self.title,
            event_type: self.event_type,
            event_date: self.event_date,
            severity: self.severity,
            summary: self.summary,
            extracted_text: self.extracted_text,
            key_findings: self.key_findings.unwrap_or_default(),
            attachment_urls: self.attachment_urls.unwrap_or_default(),
            ai_details: self.ai_details,
            created_at: self
                .created_at
                .map(|ts| ts.naive_utc())
                .unwrap_or_else(|| Utc::now().naive_utc()),
        }
    }
}

#[derive(Deserialize)]
struct DonorRow {
    user_id: String,
    profiles: Option<ProfileEmbed>,
}

/// PostgREST embeds a to-one relation as an object and a to-many one as an array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileEmbed {
    One(ProfileToken),
    Many(Vec<ProfileToken>),
}

#[derive(Deserialize)]
struct ProfileToken {
    fcm_token: Option<String>,
}

impl DonorRow {
    fn into_contact(self) -> DonorContact {
        let fcm_token = match self.profiles {
            Some(ProfileEmbed::One(p)) => p.fcm_token,
            Some(ProfileEmbed::Many(list)) => list.into_iter().find_map(|p| p.fcm_token),
            None => None,
        };
        DonorContact {
            user_id: self.user_id,
            fcm_token,
        }
    }
}
