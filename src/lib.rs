//! Roulette - settlement and outcome sourcing for a European roulette table
//!
//! Outcomes come from an external randomness process when one is configured,
//! with a local cryptographic draw as the fallback. Settlement is a pure
//! function of the outcome and the bet slip.

pub mod api;
pub mod config;
pub mod errors;
pub mod games;
pub mod wallet;

pub use config::{ConfigLoader, RouletteConfig};
pub use errors::{RouletteError, RouletteResult};
pub use games::{
    settle, Bet, BetKind, Outcome, OutcomeProvider, ProducedOutcome, RandomnessService,
    RouletteTable, Round, RoundPhase, RoundReceipt, SettlementResult, Source, VrfProcess,
};
pub use wallet::{InMemoryWallet, WalletCollaborator, WalletPayload};
