use crate::games::wheel::{Outcome, WHEEL_SIZE};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Action tag asking the process for a random position
pub const ACTION_GET_RANDOM_NUMBER: &str = "GetRandomNumber";
/// Action tag asking the process to attest a recorded result
pub const ACTION_VERIFY_RESULT: &str = "VerifyResult";

static ROUND_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier tying a service reply back to the round that asked for it.
///
/// Format: `round-<unix millis>-<16 hex chars>`. The suffix comes from the OS
/// random source; if that is unavailable the clock's nanoseconds are mixed with
/// a process-wide counter so ids still never repeat within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(String);

impl RoundId {
    pub fn generate() -> Self {
        let now = chrono::Utc::now();
        let sequence = ROUND_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 8];
        let suffix = match OsRng.try_fill_bytes(&mut bytes) {
            Ok(()) => u64::from_be_bytes(bytes),
            Err(_) => {
                let nanos = now.timestamp_subsec_nanos() as u64;
                (nanos << 20) ^ sequence
            }
        };

        Self(format!("round-{:013}-{:016x}", now.timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoundId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RoundId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an outcome came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The external randomness process answered
    External,
    /// Drawn locally after the process was unconfigured, unreachable or unintelligible
    Local,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::External => write!(f, "external"),
            Source::Local => write!(f, "local"),
        }
    }
}

/// An outcome together with the round it belongs to and how it was sourced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProducedOutcome {
    pub round_id: RoundId,
    pub outcome: Outcome,
    pub source: Source,
}

/// Name/value tag on a process message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Message sent to the external randomness process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessMessage {
    pub process: String,
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub data: String,
}

impl ProcessMessage {
    /// Ask for a random position in `0..37`
    pub fn randomness_request(process: &str, round_id: &RoundId) -> Self {
        Self {
            process: process.to_string(),
            tags: vec![
                Tag::new("Action", ACTION_GET_RANDOM_NUMBER),
                Tag::new("Range", WHEEL_SIZE.to_string()),
                Tag::new("RoundId", round_id.as_str()),
                Tag::new("Timestamp", chrono::Utc::now().timestamp_millis().to_string()),
            ],
            data: String::new(),
        }
    }

    /// Ask the process to confirm `claimed` is what it recorded for `round_id`
    pub fn verify_request(process: &str, round_id: &RoundId, claimed: i64) -> Self {
        Self {
            process: process.to_string(),
            tags: vec![
                Tag::new("Action", ACTION_VERIFY_RESULT),
                Tag::new("RoundId", round_id.as_str()),
                Tag::new("GameId", round_id.as_str()),
                Tag::new("Result", claimed.to_string()),
            ],
            data: String::new(),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    pub fn action(&self) -> Option<&str> {
        self.tag("Action")
    }
}

/// Wrap reply data the way the process answers: `{"Messages": [{"Data": "<json>"}]}`
pub fn reply_envelope(data: Value) -> Value {
    serde_json::json!({
        "Messages": [
            { "Data": data.to_string() }
        ]
    })
}

/// Pull the first message's data out of a reply envelope.
///
/// `Data` may be an object or a JSON-encoded string; both are accepted.
pub fn envelope_data(reply: &Value) -> Option<Value> {
    let data = reply.get("Messages")?.as_array()?.first()?.get("Data")?;
    match data {
        Value::String(encoded) => serde_json::from_str(encoded).ok(),
        Value::Object(_) => Some(data.clone()),
        _ => None,
    }
}

/// VRF bundle containing cryptographic proof
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VrfBundle {
    /// Hex-encoded VRF output (32 bytes)
    pub vrf_output: String,
    /// Hex-encoded VRF proof (64-byte schnorrkel signature)
    pub vrf_proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for VRF
    pub input_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_round_ids_are_unique() {
        let ids: HashSet<RoundId> = (0..1_000).map(|_| RoundId::generate()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_round_id_format() {
        let id = RoundId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "round");
        assert_eq!(parts[1].len(), 13);
        assert_eq!(parts[2].len(), 16);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_randomness_request_tags() {
        let id = RoundId::from("round-1");
        let message = ProcessMessage::randomness_request("proc-1", &id);
        assert_eq!(message.process, "proc-1");
        assert_eq!(message.action(), Some(ACTION_GET_RANDOM_NUMBER));
        assert_eq!(message.tag("Range"), Some("37"));
        assert_eq!(message.tag("RoundId"), Some("round-1"));
        assert!(message.tag("Timestamp").is_some());
    }

    #[test]
    fn test_verify_request_tags() {
        let message = ProcessMessage::verify_request("proc-1", &RoundId::from("round-9"), 14);
        assert_eq!(message.action(), Some(ACTION_VERIFY_RESULT));
        assert_eq!(message.tag("GameId"), Some("round-9"));
        assert_eq!(message.tag("Result"), Some("14"));
    }

    #[test]
    fn test_envelope_accepts_string_and_object_data() {
        let wrapped = reply_envelope(json!({"result": 12}));
        assert_eq!(envelope_data(&wrapped), Some(json!({"result": 12})));

        let plain = json!({"Messages": [{"Data": {"isValid": true}}]});
        assert_eq!(envelope_data(&plain), Some(json!({"isValid": true})));

        assert_eq!(envelope_data(&json!({"Messages": []})), None);
        assert_eq!(envelope_data(&json!({"Messages": [{"Data": "not json"}]})), None);
        assert_eq!(envelope_data(&json!("nope")), None);
    }
}
