//! In-process randomness process
//!
//! Answers the same `GetRandomNumber` / `VerifyResult` messages as the remote
//! compute process, backed by schnorrkel signatures so every position it hands
//! out can be attested later.

use crate::errors::ServiceError;
use crate::games::provider::RandomnessService;
use crate::games::types::{
    reply_envelope, ProcessMessage, RoundId, VrfBundle, ACTION_GET_RANDOM_NUMBER,
    ACTION_VERIFY_RESULT,
};
use crate::games::wheel::{Outcome, WHEEL_SIZE};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use schnorrkel::context::SigningContext;
use schnorrkel::{Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

const VRF_SIGNING_CONTEXT: &[u8] = b"roulette-randomness";

/// What the process remembers about a round it served
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    pub round_id: RoundId,
    /// Position handed out, already reduced into the requested range
    pub position: u64,
    pub outcome: Outcome,
    pub vrf: VrfBundle,
    pub recorded_at: i64,
}

/// Rounds kept for verification before the oldest are evicted
pub const DEFAULT_MAX_RECORDS: usize = 100_000;

/// Randomness process that signs `"<round_id>:<range>"` for every request
pub struct VrfProcess {
    process_id: String,
    keypair: Arc<Keypair>,
    rounds: DashMap<RoundId, RoundRecord>,
    order: Mutex<VecDeque<RoundId>>,
    max_records: usize,
}

impl VrfProcess {
    pub fn new(process_id: impl Into<String>, keypair: Keypair) -> Self {
        Self {
            process_id: process_id.into(),
            keypair: Arc::new(keypair),
            rounds: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    /// Keep at most `max_records` rounds; a round evicted this way no longer verifies
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records.max(1);
        self
    }

    /// Process with a freshly generated keypair
    pub fn with_random_key(process_id: impl Into<String>) -> Self {
        use rand_core::OsRng;
        Self::new(process_id, Keypair::generate_with(OsRng))
    }

    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }

    pub fn record(&self, round_id: &RoundId) -> Option<RoundRecord> {
        self.rounds.get(round_id).map(|entry| entry.value().clone())
    }

    pub fn rounds_served(&self) -> usize {
        self.rounds.len()
    }

    /// Handle one message and build the reply envelope
    pub fn handle(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
        if message.process != self.process_id {
            return Err(ServiceError::UnknownProcess(message.process.clone()));
        }

        match message.action() {
            Some(ACTION_GET_RANDOM_NUMBER) => self.random_number(message),
            Some(ACTION_VERIFY_RESULT) => self.verify_result(message),
            Some(other) => Err(ServiceError::UnsupportedAction(other.to_string())),
            None => Err(ServiceError::MalformedMessage("missing Action tag".to_string())),
        }
    }

    fn random_number(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
        let round_id = required_tag(message, "RoundId").map(RoundId::from)?;
        let range = match message.tag("Range") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| ServiceError::MalformedMessage(format!("invalid Range '{}'", raw)))?,
            None => WHEEL_SIZE as u64,
        };

        // Lookup and insert happen under one shard lock so a retry racing its
        // original gets the same position
        let reply = match self.rounds.entry(round_id.clone()) {
            Entry::Occupied(existing) => {
                let existing = existing.get();
                debug!(
                    "Round {} already served, replaying position {}",
                    round_id, existing.position
                );
                return Ok(position_reply(existing));
            }
            Entry::Vacant(slot) => {
                let record = self.sign_round(&round_id, range);
                info!(
                    "Served round {} position {} ({})",
                    round_id, record.position, record.outcome
                );
                let reply = position_reply(&record);
                slot.insert(record);
                reply
            }
        };

        self.remember(round_id);
        Ok(reply)
    }

    fn sign_round(&self, round_id: &RoundId, range: u64) -> RoundRecord {
        let input_message = format!("{}:{}", round_id, range);
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes());
        let position = position_from_output(&vrf_output) % range;

        RoundRecord {
            round_id: round_id.clone(),
            position,
            outcome: Outcome::from_position(position),
            vrf: VrfBundle {
                vrf_output: hex::encode(vrf_output),
                vrf_proof: hex::encode(vrf_proof),
                public_key: self.public_key_hex(),
                input_message,
            },
            recorded_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Track insertion order and drop the oldest rounds past `max_records`
    fn remember(&self, round_id: RoundId) {
        let evicted: Vec<RoundId> = {
            let mut order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
            order.push_back(round_id);
            let excess = order.len().saturating_sub(self.max_records);
            order.drain(..excess).collect()
        };

        for round_id in evicted {
            self.rounds.remove(&round_id);
            debug!("Evicted round {}", round_id);
        }
    }

    fn verify_result(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
        let round_id = message
            .tag("RoundId")
            .or_else(|| message.tag("GameId"))
            .map(RoundId::from)
            .ok_or_else(|| ServiceError::MalformedMessage("missing RoundId tag".to_string()))?;
        let claimed = required_tag(message, "Result")?;

        let is_valid = match self.rounds.get(&round_id) {
            Some(record) => {
                claimed.trim().parse::<i64>().ok() == Some(i64::from(record.outcome.value()))
                    && verify_bundle(&record.vrf, &record.vrf.input_message)
            }
            None => false,
        };

        debug!("Verification of round {} claiming {}: {}", round_id, claimed, is_valid);
        Ok(reply_envelope(json!({
            "roundId": round_id,
            "isValid": is_valid,
        })))
    }

    fn vrf_sign(&self, message: &[u8]) -> ([u8; 32], [u8; 64]) {
        let transcript = SigningContext::new(VRF_SIGNING_CONTEXT).bytes(message);
        let signature = self.keypair.sign(transcript).to_bytes();
        (output_from_signature(&signature), signature)
    }
}

#[async_trait]
impl RandomnessService for VrfProcess {
    async fn send(&self, message: &ProcessMessage) -> Result<Value, ServiceError> {
        self.handle(message)
    }
}

fn required_tag<'a>(message: &'a ProcessMessage, name: &str) -> Result<&'a str, ServiceError> {
    message
        .tag(name)
        .ok_or_else(|| ServiceError::MalformedMessage(format!("missing {} tag", name)))
}

fn position_reply(record: &RoundRecord) -> Value {
    reply_envelope(json!({
        "roundId": record.round_id,
        "result": record.position,
    }))
}

fn output_from_signature(signature: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(signature);
    hasher.finalize().into()
}

/// First 8 output bytes, big-endian
pub fn position_from_output(output: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&output[..8]);
    u64::from_be_bytes(head)
}

/// Check a bundle against the input it claims to sign.
///
/// Valid only if the signature verifies under the bundled key and the output
/// is the hash of that signature. Undecodable bundles are invalid.
pub fn verify_bundle(bundle: &VrfBundle, expected_input: &str) -> bool {
    if bundle.input_message != expected_input {
        return false;
    }

    let (Ok(output), Ok(proof), Ok(key)) = (
        hex::decode(&bundle.vrf_output),
        hex::decode(&bundle.vrf_proof),
        hex::decode(&bundle.public_key),
    ) else {
        return false;
    };

    let (Ok(public_key), Ok(signature)) =
        (PublicKey::from_bytes(&key), Signature::from_bytes(&proof))
    else {
        return false;
    };

    let transcript = SigningContext::new(VRF_SIGNING_CONTEXT).bytes(expected_input.as_bytes());
    if public_key.verify(transcript, &signature).is_err() {
        return false;
    }

    output_from_signature(&proof).as_slice() == output.as_slice()
}
