use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{PushError, PushGateway, PushMessage};

/// In-memory push gateway for tests and offline runs.
///
/// Records every send, can hold each send for a fixed latency (to observe
/// concurrency) and can fail selected tokens permanently or for a number
/// of attempts.
#[derive(Default)]
pub struct MockPushGateway {
    latency: Option<Duration>,
    authorize_error: Option<PushError>,
    failing: HashMap<String, u16>,
    flaky: Mutex<HashMap<String, usize>>,
    delivered: Mutex<Vec<(String, PushMessage)>>,
    sends: AtomicUsize,
    authorizations: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every send to `token` is rejected with `status`.
    pub fn failing_token(mut self, token: &str, status: u16) -> Self {
        self.failing.insert(token.to_string(), status);
        self
    }

    /// The first `failures` sends to `token` fail with a 503.
    pub fn flaky_token(self, token: &str, failures: usize) -> Self {
        if let Ok(mut flaky) = self.flaky.lock() {
            flaky.insert(token.to_string(), failures);
        }
        self
    }

    /// `authorize` fails with `error`, as with revoked credentials.
    pub fn failing_authorize(mut self, error: PushError) -> Self {
        self.authorize_error = Some(error);
        self
    }

    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn authorize_count(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Tokens that were delivered successfully, in completion order.
    pub fn delivered_tokens(&self) -> Vec<String> {
        self.delivered
            .lock()
            .map(|d| d.iter().map(|(token, _)| token.clone()).collect())
            .unwrap_or_default()
    }

    pub fn last_message(&self) -> Option<PushMessage> {
        self.delivered
            .lock()
            .ok()
            .and_then(|d| d.last().map(|(_, m)| m.clone()))
    }

    async fn send_inner(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let outcome = self.outcome(token, message);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn outcome(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        if let Some(status) = self.failing.get(token) {
            return Err(PushError::Rejected {
                status: *status,
                body: "mock rejection".into(),
            });
        }
        if let Ok(mut flaky) = self.flaky.lock() {
            if let Some(remaining) = flaky.get_mut(token) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PushError::Rejected {
                        status: 503,
                        body: "mock unavailable".into(),
                    });
                }
            }
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push((token.to_string(), message.clone()));
        }
        Ok(())
    }
}

impl PushGateway for MockPushGateway {
    fn authorize(&self) -> BoxFuture<'_, Result<(), PushError>> {
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        let result = match &self.authorize_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
        async move { result }.boxed()
    }

    fn send<'a>(
        &'a self,
        token: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, Result<(), PushError>> {
        self.send_inner(token, message).boxed()
    }
}
