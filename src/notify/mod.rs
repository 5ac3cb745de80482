//! Push notifications to blood donors.
//!
//! `recipients` turns donor rows into a clean, deduplicated recipient list,
//! `credentials` holds the service account and its cached access token,
//! `fcm` talks to the push gateway and `fanout` drives a bounded, retrying
//! delivery over all recipients.

pub mod credentials;
pub mod fanout;
pub mod fcm;
pub mod mock;
pub mod recipients;

pub use credentials::{ServiceAccount, TokenProvider};
pub use fanout::{deliver_all, DeliveryFailure, DeliveryReport, FanoutConfig, RetryPolicy};
pub use fcm::FcmGateway;
pub use mock::MockPushGateway;
pub use recipients::{is_valid_token, token_hint, unique_recipients, Recipient};

use futures_util::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::models::BloodGroup;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("Invalid service account: {0}")]
    ServiceAccount(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Token exchange failed (status {status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Push transport error: {0}")]
    Transport(String),

    #[error("Push request timed out")]
    Timeout,

    #[error("Push gateway rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl PushError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Rejected { status, .. } | Self::TokenExchange { status, .. } => {
                *status == 401 || *status == 429 || *status >= 500
            }
            Self::ServiceAccount(_) | Self::Signing(_) => false,
        }
    }
}

/// Notification content, identical for every recipient of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: Vec<(String, String)>,
}

impl PushMessage {
    /// The blood-request alert sent to donors.
    pub fn blood_request(blood_group: BloodGroup, hospital: &str, urgency: &str) -> Self {
        Self {
            title: format!("🩸 Urgent: {blood_group} Blood Needed!"),
            body: format!("{urgency} Request at {hospital}. Tap to help!"),
            data: vec![
                ("type".into(), "blood_request".into()),
                ("click_action".into(), "FLUTTER_NOTIFICATION_CLICK".into()),
            ],
        }
    }
}

/// A blood request to broadcast and the devices it goes to.
#[derive(Debug, Clone)]
pub struct DonorNotificationBatch {
    pub blood_group: BloodGroup,
    pub hospital: String,
    /// Free-form urgency label from the requester (`NORMAL`, `CRITICAL`, ...).
    pub urgency: String,
    pub recipients: Vec<Recipient>,
}

impl DonorNotificationBatch {
    pub fn message(&self) -> PushMessage {
        PushMessage::blood_request(self.blood_group, &self.hospital, &self.urgency)
    }
}

/// Push gateway seam.
pub trait PushGateway: Send + Sync {
    /// Make sure credentials are usable before a batch starts.
    fn authorize(&self) -> BoxFuture<'_, Result<(), PushError>>;

    /// Deliver one message to one device token.
    fn send<'a>(&'a self, token: &'a str, message: &'a PushMessage) -> BoxFuture<'a, Result<(), PushError>>;
}
