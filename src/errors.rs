//! Error types for the roulette core
//!
//! Each concern gets its own enum; `RouletteError` rolls them up for callers
//! that just want to bubble everything with `?`.
//!
//! Outcome production and verification never surface `ServiceError` to the
//! caller: production falls back to local randomness and verification reports
//! `false`. The variants exist so the provider can log what went wrong.

use crate::games::bets::BetTag;
use crate::games::round::RoundPhase;

/// Configuration and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Failures talking to the external randomness process
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Randomness service not configured")]
    NotConfigured,

    #[error("Randomness service unavailable: {0}")]
    Unavailable(String),

    #[error("Randomness service timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Message addressed to unknown process: {0}")]
    UnknownProcess(String),

    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),
}

/// Bet-entry validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BetError {
    #[error("Stake must be a positive amount, got {0}")]
    NonPositiveStake(f64),

    #[error("Stake {stake} is below the table minimum of {min}")]
    BelowMinimum { stake: f64, min: f64 },

    #[error("Stake {stake} is above the table maximum of {max}")]
    AboveMaximum { stake: f64, max: f64 },

    #[error("Bet type '{0}' is not supported at this table")]
    UnsupportedBetType(BetTag),

    #[error("Unknown bet type: {0}")]
    UnknownBetType(String),

    #[error("Straight bets need a number between 0 and 36")]
    InvalidStraightNumber,

    #[error("Bet slip is full (max {max} bets)")]
    TooManyBets { max: usize },

    #[error("Invalid bet description '{0}'")]
    Unparsable(String),
}

/// Round state machine errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Cannot apply {event} while the round is {phase}")]
    InvalidTransition { phase: RoundPhase, event: &'static str },

    #[error("Cannot spin without any bets")]
    EmptyBetSlip,

    #[error("No bet at position {0}")]
    NoSuchBet(usize),

    #[error(transparent)]
    Bet(#[from] BetError),
}

/// Wallet collaborator errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalletError {
    #[error("Insufficient balance: {available}. You need {needed} to place this bet")]
    InsufficientFunds { needed: String, available: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Wallet rejected the transaction: {0}")]
    Rejected(String),
}

/// Root error type for all roulette operations
#[derive(Debug, thiserror::Error)]
pub enum RouletteError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
}

impl From<BetError> for RouletteError {
    fn from(e: BetError) -> Self {
        RouletteError::Game(GameError::Bet(e))
    }
}

// Convenience type alias for Results
pub type RouletteResult<T> = Result<T, RouletteError>;
