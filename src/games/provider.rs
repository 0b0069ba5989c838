//! Outcome Provider
//!
//! Sources the wheel value for a round. The external randomness process is
//! asked first; if it is not configured, fails, times out or answers with
//! something unintelligible, the value is drawn locally instead. Producing an
//! outcome therefore always succeeds.
//!
//! Verification runs the other way around. Without a configured process it
//! degrades to a wheel-membership check, which proves nothing about tampering.
//! With a process configured, any failure to get a clear `isValid: true` back
//! is reported as `false`. A round must never stall waiting on the process,
//! and a result must never be confirmed that the process did not attest.

use crate::config::ProviderConfig;
use crate::errors::ServiceError;
use crate::games::types::{envelope_data, ProcessMessage, ProducedOutcome, RoundId, Source};
use crate::games::wheel::{is_wheel_value, Outcome, WHEEL_SIZE};
use async_trait::async_trait;
use rand::rngs::{OsRng, SmallRng, StdRng};
use rand::{Rng, SeedableRng};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

static WEAK_SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Transport to the external randomness process
#[async_trait]
pub trait RandomnessService: Send + Sync {
    /// Deliver `message` and return the raw reply envelope
    async fn send(&self, message: &ProcessMessage) -> Result<Value, ServiceError>;
}

/// Produces and attests round outcomes
pub struct OutcomeProvider {
    process_id: Option<String>,
    service: Option<Arc<dyn RandomnessService>>,
    request_timeout: Duration,
}

impl OutcomeProvider {
    pub fn new(
        process_id: Option<String>,
        service: Option<Arc<dyn RandomnessService>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            process_id: process_id.filter(|id| !id.trim().is_empty()),
            service,
            request_timeout,
        }
    }

    /// Provider that always draws locally
    pub fn local_only() -> Self {
        Self::new(None, None, ProviderConfig::default().request_timeout())
    }

    pub fn from_config(
        config: &ProviderConfig,
        service: Option<Arc<dyn RandomnessService>>,
    ) -> Self {
        Self::new(config.process_id.clone(), service, config.request_timeout())
    }

    /// Both a process id and a transport are needed to reach the process
    pub fn is_configured(&self) -> bool {
        self.target().is_some()
    }

    pub fn process_id(&self) -> Option<&str> {
        self.process_id.as_deref()
    }

    fn target(&self) -> Option<(&str, &Arc<dyn RandomnessService>)> {
        match (&self.process_id, &self.service) {
            (Some(process), Some(service)) => Some((process.as_str(), service)),
            _ => None,
        }
    }

    /// Produce the outcome for a new round
    pub async fn produce_outcome(&self) -> ProducedOutcome {
        let round_id = RoundId::generate();

        match self.request_external(&round_id).await {
            Ok(outcome) => {
                info!("Round {} landed on {} (external)", round_id, outcome);
                ProducedOutcome {
                    round_id,
                    outcome,
                    source: Source::External,
                }
            }
            Err(ServiceError::NotConfigured) => {
                debug!("Randomness process not configured, drawing round {} locally", round_id);
                Self::local_outcome(round_id)
            }
            Err(e) => {
                warn!(
                    "Randomness process failed for round {} ({}), falling back to local randomness",
                    round_id, e
                );
                Self::local_outcome(round_id)
            }
        }
    }

    fn local_outcome(round_id: RoundId) -> ProducedOutcome {
        let outcome = draw_local();
        info!("Round {} landed on {} (local)", round_id, outcome);
        ProducedOutcome {
            round_id,
            outcome,
            source: Source::Local,
        }
    }

    async fn request_external(&self, round_id: &RoundId) -> Result<Outcome, ServiceError> {
        let (process, service) = self.target().ok_or(ServiceError::NotConfigured)?;
        let message = ProcessMessage::randomness_request(process, round_id);
        let reply = self.call(service.as_ref(), &message).await?;
        parse_randomness_reply(&reply, round_id)
    }

    async fn call(
        &self,
        service: &dyn RandomnessService,
        message: &ProcessMessage,
    ) -> Result<Value, ServiceError> {
        match tokio::time::timeout(self.request_timeout, service.send(message)).await {
            Ok(reply) => reply,
            Err(_) => Err(ServiceError::Timeout {
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }

    /// Check that `claimed` is the genuine outcome of `round_id`
    pub async fn verify_outcome(&self, round_id: &RoundId, claimed: i64) -> bool {
        let Some((process, service)) = self.target() else {
            debug!(
                "Randomness process not configured, verifying round {} by wheel membership only",
                round_id
            );
            return is_wheel_value(claimed);
        };

        let message = ProcessMessage::verify_request(process, round_id, claimed);
        let verdict = match self.call(service.as_ref(), &message).await {
            Ok(reply) => parse_verification_reply(&reply),
            Err(e) => Err(e),
        };

        match verdict {
            Ok(valid) => {
                debug!("Round {} claimed {}: valid={}", round_id, claimed, valid);
                valid
            }
            Err(e) => {
                warn!("Could not verify round {} ({}), treating result as invalid", round_id, e);
                false
            }
        }
    }
}

/// Read an outcome out of a `GetRandomNumber` reply for round `expected`.
///
/// `value` carries a wheel value directly; `result` carries a position that is
/// reduced mod 37 and mapped through the layout. A reply naming a different
/// round is rejected.
pub fn parse_randomness_reply(reply: &Value, expected: &RoundId) -> Result<Outcome, ServiceError> {
    let data = envelope_data(reply)
        .ok_or_else(|| ServiceError::MalformedReply("missing message data".to_string()))?;

    if let Some(round_id) = data.get("roundId") {
        if round_id.as_str() != Some(expected.as_str()) {
            return Err(ServiceError::MalformedReply(format!(
                "reply for round {} while waiting on {}",
                round_id, expected
            )));
        }
    }

    if let Some(value) = data.get("value") {
        return value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Outcome::new)
            .ok_or_else(|| {
                ServiceError::MalformedReply(format!("{} is not a wheel value", value))
            });
    }

    if let Some(position) = data.get("result") {
        return position
            .as_u64()
            .map(Outcome::from_position)
            .ok_or_else(|| {
                ServiceError::MalformedReply(format!("{} is not a wheel position", position))
            });
    }

    Err(ServiceError::MalformedReply(format!("unexpected data: {}", data)))
}

/// Read a `VerifyResult` reply. Only a literal `true` counts as valid.
pub fn parse_verification_reply(reply: &Value) -> Result<bool, ServiceError> {
    let data = envelope_data(reply)
        .ok_or_else(|| ServiceError::MalformedReply("missing message data".to_string()))?;
    Ok(data.get("isValid") == Some(&Value::Bool(true)))
}

/// Uniform draw over the wheel from any generator
pub fn draw_from<R: Rng>(rng: &mut R) -> Outcome {
    Outcome::from_position(rng.gen_range(0..WHEEL_SIZE as u64))
}

/// Local draw: a CSPRNG seeded from the OS, or a clock-seeded generator when
/// the OS source cannot be read
pub fn draw_local() -> Outcome {
    match StdRng::from_rng(OsRng) {
        Ok(mut rng) => draw_from(&mut rng),
        Err(e) => {
            warn!("OS random source unavailable ({}), using a clock-seeded generator", e);
            let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
            let seed = nanos ^ WEAK_SEED_COUNTER.fetch_add(1, Ordering::Relaxed).rotate_left(32);
            draw_from(&mut SmallRng::seed_from_u64(seed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{reply_envelope, ACTION_GET_RANDOM_NUMBER, ACTION_VERIFY_RESULT};
    use crate::games::wheel::WHEEL_LAYOUT;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a canned envelope and records what it was sent
    struct CannedService {
        reply: Value,
        seen: Mutex<Vec<ProcessMessage>>,
    }

    impl CannedService {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RandomnessService for CannedService {
        async fn send(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
            self.seen.lock().unwrap().push(message.clone());
            Ok(self.reply.clone())
        }
    }

    struct DownService;

    #[async_trait]
    impl RandomnessService for DownService {
        async fn send(&self, _message: &ProcessMessage) -> Result<Value, ServiceError> {
            Err(ServiceError::Unavailable("connection refused".to_string()))
        }
    }

    struct SlowService;

    #[async_trait]
    impl RandomnessService for SlowService {
        async fn send(&self, _message: &ProcessMessage) -> Result<Value, ServiceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(reply_envelope(json!({"value": 7})))
        }
    }

    fn provider(service: Arc<dyn RandomnessService>) -> OutcomeProvider {
        OutcomeProvider::new(Some("proc-1".to_string()), Some(service), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_external_position_maps_through_layout() {
        let service = CannedService::new(reply_envelope(json!({"result": 38})));
        let produced = provider(service.clone()).produce_outcome().await;

        assert_eq!(produced.source, Source::External);
        assert_eq!(produced.outcome.value(), WHEEL_LAYOUT[1]);

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].process, "proc-1");
        assert_eq!(seen[0].action(), Some(ACTION_GET_RANDOM_NUMBER));
        assert_eq!(seen[0].tag("Range"), Some("37"));
        assert_eq!(seen[0].tag("RoundId"), Some(produced.round_id.as_str()));
    }

    #[tokio::test]
    async fn test_external_direct_value() {
        let service = CannedService::new(reply_envelope(json!({"value": 26})));
        let produced = provider(service).produce_outcome().await;

        assert_eq!(produced.source, Source::External);
        assert_eq!(produced.outcome.value(), 26);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_draws_locally() {
        let produced = OutcomeProvider::local_only().produce_outcome().await;
        assert_eq!(produced.source, Source::Local);

        let service = CannedService::new(reply_envelope(json!({"value": 1})));
        let no_process = OutcomeProvider::new(
            Some("  ".to_string()),
            Some(service.clone()),
            Duration::from_millis(50),
        );
        assert!(!no_process.is_configured());
        assert_eq!(no_process.produce_outcome().await.source, Source::Local);
        assert!(service.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_falls_back() {
        let produced = provider(Arc::new(DownService)).produce_outcome().await;
        assert_eq!(produced.source, Source::Local);
        assert!(WHEEL_LAYOUT.contains(&produced.outcome.value()));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let produced = provider(Arc::new(SlowService)).produce_outcome().await;
        assert_eq!(produced.source, Source::Local);
    }

    #[tokio::test]
    async fn test_malformed_replies_fall_back() {
        let replies = [
            json!({"Messages": []}),
            reply_envelope(json!({"result": -3})),
            reply_envelope(json!({"result": 2.5})),
            reply_envelope(json!({"result": "12"})),
            reply_envelope(json!({"value": 37})),
            reply_envelope(json!({"status": "ok"})),
            reply_envelope(json!({"roundId": "someone-elses-round", "result": 4})),
            reply_envelope(json!({"roundId": 17, "value": 4})),
        ];

        for reply in replies {
            let produced = provider(CannedService::new(reply.clone())).produce_outcome().await;
            assert_eq!(produced.source, Source::Local, "reply {} should fall back", reply);
        }
    }

    #[test]
    fn test_reply_must_name_the_requested_round() {
        let round = RoundId::from("round-1");

        let matching = reply_envelope(json!({"roundId": "round-1", "result": 1}));
        assert_eq!(
            parse_randomness_reply(&matching, &round).unwrap().value(),
            WHEEL_LAYOUT[1]
        );

        let stale = reply_envelope(json!({"roundId": "round-0", "result": 1}));
        assert!(matches!(
            parse_randomness_reply(&stale, &round),
            Err(ServiceError::MalformedReply(_))
        ));

        let unnamed = reply_envelope(json!({"value": 9}));
        assert_eq!(parse_randomness_reply(&unnamed, &round).unwrap().value(), 9);
    }

    #[test]
    fn test_local_draws_stay_on_the_wheel() {
        for _ in 0..10_000 {
            let outcome = draw_local();
            assert!(WHEEL_LAYOUT.contains(&outcome.value()));
            assert!(outcome.value() <= 36);
        }
    }

    #[test]
    fn test_weak_generator_covers_the_wheel() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut seen = [false; 37];
        for _ in 0..10_000 {
            seen[draw_from(&mut rng).value() as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[tokio::test]
    async fn test_unconfigured_verification_is_membership_only() {
        let provider = OutcomeProvider::local_only();
        let round = RoundId::generate();

        assert!(provider.verify_outcome(&round, 5).await);
        assert!(provider.verify_outcome(&round, 0).await);
        assert!(!provider.verify_outcome(&round, 99).await);
        assert!(!provider.verify_outcome(&round, -1).await);
    }

    #[tokio::test]
    async fn test_configured_verification_asks_the_process() {
        let service = CannedService::new(reply_envelope(json!({"isValid": true})));
        let round = RoundId::from("round-7");

        assert!(provider(service.clone()).verify_outcome(&round, 12).await);

        let seen = service.seen.lock().unwrap();
        assert_eq!(seen[0].action(), Some(ACTION_VERIFY_RESULT));
        assert_eq!(seen[0].tag("RoundId"), Some("round-7"));
        assert_eq!(seen[0].tag("Result"), Some("12"));
    }

    #[tokio::test]
    async fn test_verification_fails_closed() {
        let round = RoundId::from("round-7");

        assert!(!provider(Arc::new(DownService)).verify_outcome(&round, 5).await);
        assert!(!provider(Arc::new(SlowService)).verify_outcome(&round, 5).await);
        assert!(!provider(CannedService::new(json!({}))).verify_outcome(&round, 5).await);
        assert!(
            !provider(CannedService::new(reply_envelope(json!({"isValid": "true"}))))
                .verify_outcome(&round, 5)
                .await
        );
        assert!(
            !provider(CannedService::new(reply_envelope(json!({"isValid": false}))))
                .verify_outcome(&round, 5)
                .await
        );
    }
}
