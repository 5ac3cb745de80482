use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use rand::Rng;
use serde::Serialize;

use super::recipients::{token_hint, Recipient};
use super::{PushError, PushGateway, PushMessage};

/// Bounded retry with exponential backoff for transient send failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before attempt `attempt + 1`: base * 2^(attempt-1), plus up to
    /// half of that again as jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis() as u64 / 2);
        exp + Duration::from_millis(jitter_ms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Sends in flight at once.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            concurrency: crate::config::DEFAULT_FANOUT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// One recipient that could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    /// Donor user id.
    pub recipient: String,
    pub token_hint: String,
    pub cause: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub sent_count: usize,
    pub failed_count: usize,
    pub failures: Vec<DeliveryFailure>,
}

type SendOutcome = (usize, Result<u32, (PushError, u32)>);

/// Send `message` to every recipient, at most `config.concurrency` at a
/// time. Each recipient is attempted independently; one failure never
/// stops the others. Failures are reported in recipient order.
pub async fn deliver_all(
    gateway: &dyn PushGateway,
    message: &PushMessage,
    recipients: &[Recipient],
    config: &FanoutConfig,
) -> DeliveryReport {
    let concurrency = config.concurrency.max(1);
    let retry = config.retry;

    let mut pending = recipients.iter().enumerate();
    let mut in_flight: FuturesUnordered<BoxFuture<'_, SendOutcome>> = FuturesUnordered::new();
    let mut outcomes: Vec<SendOutcome> = Vec::with_capacity(recipients.len());
    loop {
        while in_flight.len() < concurrency {
            let Some((index, recipient)) = pending.next() else {
                break;
            };
            in_flight.push(send_with_retry(index, gateway, message, recipient, retry).boxed());
        }
        match in_flight.next().await {
            Some(outcome) => outcomes.push(outcome),
            None => break,
        }
    }
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = DeliveryReport::default();
    for (index, outcome) in outcomes {
        match outcome {
            Ok(_) => report.sent_count += 1,
            Err((error, attempts)) => {
                let recipient = &recipients[index];
                report.failed_count += 1;
                report.failures.push(DeliveryFailure {
                    recipient: recipient.user_id.clone(),
                    token_hint: token_hint(&recipient.token),
                    cause: error.to_string(),
                    attempts,
                });
            }
        }
    }

    tracing::info!(
        recipients = recipients.len(),
        sent = report.sent_count,
        failed = report.failed_count,
        "Push fan-out complete"
    );
    report
}

async fn send_with_retry(
    index: usize,
    gateway: &dyn PushGateway,
    message: &PushMessage,
    recipient: &Recipient,
    retry: RetryPolicy,
) -> SendOutcome {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match gateway.send(&recipient.token, message).await {
            Ok(()) => return (index, Ok(attempt)),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::debug!(
                    user_id = %recipient.user_id,
                    attempt,
                    error = %e,
                    "Push send failed, retrying"
                );
                tokio::time::sleep(retry.backoff(attempt)).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %recipient.user_id,
                    token = %token_hint(&recipient.token),
                    attempts = attempt,
                    error = %e,
                    "Push delivery failed"
                );
                return (index, Err((e, attempt)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BloodGroup;
    use crate::notify::MockPushGateway;

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient {
                user_id: format!("u{i}"),
                token: format!("device-token-{i:04}"),
            })
            .collect()
    }

    fn message() -> PushMessage {
        PushMessage::blood_request(BloodGroup::OPos, "City Hospital", "CRITICAL")
    }

    fn fast(concurrency: usize) -> FanoutConfig {
        FanoutConfig {
            concurrency,
            retry: RetryPolicy::no_delay(3),
        }
    }

    #[tokio::test]
    async fn every_recipient_receives_one_send() {
        let gateway = MockPushGateway::new();
        let recipients = recipients(40);
        let report = deliver_all(&gateway, &message(), &recipients, &fast(16)).await;

        assert_eq!(report.sent_count, 40);
        assert_eq!(report.failed_count, 0);
        assert_eq!(gateway.send_count(), 40);
        assert_eq!(gateway.delivered_tokens().len(), 40);
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let gateway = MockPushGateway::new().with_latency(Duration::from_millis(20));
        let report = deliver_all(&gateway, &message(), &recipients(30), &fast(4)).await;

        assert_eq!(report.sent_count, 30);
        assert!(gateway.max_in_flight() <= 4);
        assert!(gateway.max_in_flight() >= 2);
    }

    #[tokio::test]
    async fn permanent_failure_does_not_stop_others() {
        let gateway = MockPushGateway::new().failing_token("device-token-0003", 404);
        let recipients = recipients(6);
        let report = deliver_all(&gateway, &message(), &recipients, &fast(2)).await;

        assert_eq!(report.sent_count, 5);
        assert_eq!(report.failed_count, 1);
        let failure = &report.failures[0];
        assert_eq!(failure.recipient, "u3");
        assert_eq!(failure.token_hint, "…n-0003");
        assert_eq!(failure.attempts, 1);
    }

    #[tokio::test]
    async fn transient_failure_retried_until_limit() {
        let gateway = MockPushGateway::new().failing_token("device-token-0000", 503);
        let report = deliver_all(&gateway, &message(), &recipients(1), &fast(1)).await;

        assert_eq!(report.failed_count, 1);
        assert_eq!(report.failures[0].attempts, 3);
        assert_eq!(gateway.send_count(), 3);
    }

    #[tokio::test]
    async fn transient_failure_recovers() {
        let gateway = MockPushGateway::new().flaky_token("device-token-0000", 2);
        let report = deliver_all(&gateway, &message(), &recipients(1), &fast(1)).await;

        assert_eq!(report.sent_count, 1);
        assert_eq!(gateway.send_count(), 3);
    }

    #[tokio::test]
    async fn empty_recipient_list_sends_nothing() {
        let gateway = MockPushGateway::new();
        let report = deliver_all(&gateway, &message(), &[], &FanoutConfig::default()).await;
        assert_eq!(report, DeliveryReport::default());
        assert_eq!(gateway.send_count(), 0);
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn delivery_future_is_send() {
        let gateway = MockPushGateway::new();
        let message = message();
        let recipients = recipients(2);
        let config = FanoutConfig::default();
        let dyn_gateway: &dyn PushGateway = &gateway;
        assert_send(deliver_all(dyn_gateway, &message, &recipients, &config));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        let first = policy.backoff(1);
        let second = policy.backoff(2);
        assert!(first >= Duration::from_millis(200) && first <= Duration::from_millis(300));
        assert!(second >= Duration::from_millis(400) && second <= Duration::from_millis(600));
        assert_eq!(RetryPolicy::no_delay(3).backoff(2), Duration::ZERO);
    }
}
