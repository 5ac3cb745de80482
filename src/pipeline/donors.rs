//! Donor notification: find available donors for a blood group and push
//! the request to each distinct device.

use std::str::FromStr;

use super::extraction::ExtractionError;
use super::PipelineError;
use crate::db::DonorDirectory;
use crate::models::BloodGroup;
use crate::notify::{
    deliver_all, unique_recipients, DeliveryReport, DonorNotificationBatch, FanoutConfig,
    PushGateway,
};

/// What to broadcast, as sent by the requester.
#[derive(Debug, Clone)]
pub struct NotifyRequest<'a> {
    pub blood_group: &'a str,
    pub hospital: &'a str,
    pub urgency: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No donor had a usable device token; nothing was sent.
    NoDonors,
    Delivered(DeliveryReport),
}

fn parse_request(request: &NotifyRequest<'_>) -> Result<(BloodGroup, String, String), ExtractionError> {
    let blood_group = BloodGroup::from_str(request.blood_group.trim())
        .map_err(|e| ExtractionError::InvalidInput(e.to_string()))?;
    let hospital = request.hospital.trim();
    if hospital.is_empty() {
        return Err(ExtractionError::InvalidInput("hospital is required".into()));
    }
    let urgency = request.urgency.trim();
    if urgency.is_empty() {
        return Err(ExtractionError::InvalidInput("urgency is required".into()));
    }
    Ok((blood_group, hospital.to_string(), urgency.to_string()))
}

/// Resolve the recipient batch for a request.
pub async fn build_batch(
    directory: &dyn DonorDirectory,
    request: &NotifyRequest<'_>,
) -> Result<DonorNotificationBatch, PipelineError> {
    let (blood_group, hospital, urgency) = parse_request(request)?;
    let donors = directory.available_donors(blood_group).await?;
    let donor_count = donors.len();
    let recipients = unique_recipients(donors);

    tracing::info!(
        blood_group = blood_group.as_str(),
        donors = donor_count,
        recipients = recipients.len(),
        "Donor recipients resolved"
    );
    Ok(DonorNotificationBatch {
        blood_group,
        hospital,
        urgency,
        recipients,
    })
}

/// Notify every available donor of the requested blood group.
///
/// Credentials are only exercised once there is someone to notify.
/// Individual delivery failures end up in the report; only an unusable
/// gateway (bad credentials, failed token exchange) fails the call.
pub async fn notify_donors(
    directory: &dyn DonorDirectory,
    gateway: &dyn PushGateway,
    request: &NotifyRequest<'_>,
    fanout: &FanoutConfig,
) -> Result<NotifyOutcome, PipelineError> {
    let batch = build_batch(directory, request).await?;
    if batch.recipients.is_empty() {
        return Ok(NotifyOutcome::NoDonors);
    }

    gateway.authorize().await?;
    let message = batch.message();
    let report = deliver_all(gateway, &message, &batch.recipients, fanout).await;
    Ok(NotifyOutcome::Delivered(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SqliteStore, StoreError};
    use crate::notify::{MockPushGateway, PushError, RetryPolicy};

    fn request(blood_group: &'static str) -> NotifyRequest<'static> {
        NotifyRequest {
            blood_group,
            hospital: "City Hospital",
            urgency: "CRITICAL",
        }
    }

    fn fast() -> FanoutConfig {
        FanoutConfig {
            concurrency: 4,
            retry: RetryPolicy::no_delay(3),
        }
    }

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_donor("u1", BloodGroup::OPos, true, Some("abc")).unwrap();
        store
            .upsert_donor("u2", BloodGroup::OPos, true, Some("validtoken123"))
            .unwrap();
        store
            .upsert_donor("u3", BloodGroup::OPos, true, Some("validtoken123"))
            .unwrap();
        store.upsert_donor("u4", BloodGroup::OPos, true, Some("")).unwrap();
        store
            .upsert_donor("u5", BloodGroup::OPos, false, Some("unavailable-token"))
            .unwrap();
        store
            .upsert_donor("u6", BloodGroup::ANeg, true, Some("other-group-token"))
            .unwrap();
        store
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn notify_future_is_send() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gateway = MockPushGateway::new();
        let directory: &dyn DonorDirectory = &store;
        let push: &dyn PushGateway = &gateway;
        let req = request("O+");
        let fanout = fast();
        assert_send(notify_donors(directory, push, &req, &fanout));
    }

    #[tokio::test]
    async fn duplicate_tokens_notified_once() {
        let store = seeded_store();
        let gateway = MockPushGateway::new();

        let outcome = notify_donors(&store, &gateway, &request("O+"), &fast())
            .await
            .unwrap();
        let NotifyOutcome::Delivered(report) = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(report.sent_count, 1);
        assert_eq!(report.failed_count, 0);
        assert_eq!(gateway.delivered_tokens(), vec!["validtoken123"]);
        let message = gateway.last_message().unwrap();
        assert_eq!(message.title, "🩸 Urgent: O+ Blood Needed!");
        assert_eq!(message.body, "CRITICAL Request at City Hospital. Tap to help!");
    }

    #[tokio::test]
    async fn no_donors_means_no_push_and_no_auth() {
        let store = seeded_store();
        let gateway = MockPushGateway::new();

        let outcome = notify_donors(&store, &gateway, &request("AB-"), &fast())
            .await
            .unwrap();
        assert_eq!(outcome, NotifyOutcome::NoDonors);
        assert_eq!(gateway.send_count(), 0);
        assert_eq!(gateway.authorize_count(), 0);
    }

    #[tokio::test]
    async fn unknown_blood_group_rejected_before_lookup() {
        let store = seeded_store();
        let gateway = MockPushGateway::new();
        let err = notify_donors(&store, &gateway, &request("C+"), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn blank_hospital_rejected() {
        let store = seeded_store();
        let gateway = MockPushGateway::new();
        let bad = NotifyRequest {
            hospital: "  ",
            ..request("O+")
        };
        assert!(notify_donors(&store, &gateway, &bad, &fast()).await.is_err());
    }

    #[tokio::test]
    async fn failed_authorization_fails_request_without_sends() {
        let store = seeded_store();
        let gateway = MockPushGateway::new().failing_authorize(PushError::TokenExchange {
            status: 400,
            body: "invalid_grant".into(),
        });
        let err = notify_donors(&store, &gateway, &request("O+"), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Push(_)));
        assert_eq!(gateway.send_count(), 0);
    }

    #[tokio::test]
    async fn partial_failure_is_reported_not_raised() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .upsert_donor("u1", BloodGroup::BNeg, true, Some("good-device-token"))
            .unwrap();
        store
            .upsert_donor("u2", BloodGroup::BNeg, true, Some("stale-device-token"))
            .unwrap();
        let gateway = MockPushGateway::new().failing_token("stale-device-token", 404);

        let outcome = notify_donors(&store, &gateway, &request("B-"), &fast())
            .await
            .unwrap();
        let NotifyOutcome::Delivered(report) = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(report.sent_count, 1);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.failures[0].recipient, "u2");
    }

    #[tokio::test]
    async fn directory_errors_propagate() {
        struct BrokenDirectory;
        impl DonorDirectory for BrokenDirectory {
            fn available_donors(
                &self,
                _blood_group: BloodGroup,
            ) -> futures_util::future::BoxFuture<'_, Result<Vec<crate::models::DonorContact>, StoreError>>
            {
                Box::pin(async { Err(StoreError::Http("connection refused".into())) })
            }
        }
        let gateway = MockPushGateway::new();
        let err = notify_donors(&BrokenDirectory, &gateway, &request("O+"), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
        assert_eq!(gateway.authorize_count(), 0);
    }
}
