pub mod bets;
pub mod provider;
pub mod round;
pub mod settlement;
pub mod types;
pub mod vrf_process;
pub mod wheel;

pub use bets::{Bet, BetKind, BetTag, TableLimits, WireBet};
pub use provider::{OutcomeProvider, RandomnessService};
pub use round::{Round, RoundEvent, RoundPhase, RoundReceipt, RouletteTable};
pub use settlement::{settle, SettlementResult};
pub use types::{ProducedOutcome, ProcessMessage, RoundId, Source};
pub use vrf_process::VrfProcess;
pub use wheel::{Color, Outcome, WHEEL_LAYOUT};
