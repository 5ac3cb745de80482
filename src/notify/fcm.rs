use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;

use super::credentials::TokenProvider;
use super::{PushError, PushGateway, PushMessage};

pub const DEFAULT_FCM_BASE_URL: &str = "https://fcm.googleapis.com";

/// Firebase Cloud Messaging HTTP v1 client.
pub struct FcmGateway {
    base_url: String,
    tokens: Arc<TokenProvider>,
    client: reqwest::Client,
}

impl FcmGateway {
    pub fn new(tokens: Arc<TokenProvider>, timeout: Duration) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: DEFAULT_FCM_BASE_URL.to_string(),
            tokens,
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn token_provider(&self) -> &TokenProvider {
        &self.tokens
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.base_url,
            self.tokens.account().project_id
        )
    }

    async fn send_inner(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        let access_token = self.tokens.access_token().await?;
        let body = SendRequest {
            message: WireMessage {
                token,
                notification: Notification {
                    title: &message.title,
                    body: &message.body,
                },
                data: message
                    .data
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect(),
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PushError::Timeout
                } else {
                    PushError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; the retry will exchange again.
            self.tokens.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        Err(PushError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl PushGateway for FcmGateway {
    fn authorize(&self) -> BoxFuture<'_, Result<(), PushError>> {
        async move { self.tokens.access_token().await.map(|_| ()) }.boxed()
    }

    fn send<'a>(
        &'a self,
        token: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Result<(), PushError>> {
        self.send_inner(token, message).boxed()
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    token: &'a str,
    notification: Notification<'a>,
    data: BTreeMap<&'a str, &'a str>,
}

#[derive(Serialize)]
struct Notification<'a> {
    title: &'a str,
    body: &'a str,
}
