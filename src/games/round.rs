//! Round lifecycle
//!
//! A round moves Idle → Betting → Spinning → Resolved{Win,Loss} and back to
//! Idle. All of its state lives in an explicit [`RoundContext`] that
//! [`transition`] mutates only when the event is accepted.

use crate::errors::GameError;
use crate::games::bets::{Bet, TableLimits};
use crate::games::provider::OutcomeProvider;
use crate::games::settlement::{settle, total_staked, SettlementResult};
use crate::games::types::{ProducedOutcome, RoundId, Source};
use crate::games::wheel::Outcome;
use crate::wallet::WalletPayload;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    Betting,
    Spinning,
    ResolvedWin,
    ResolvedLoss,
}

impl RoundPhase {
    pub fn is_resolved(&self) -> bool {
        matches!(self, RoundPhase::ResolvedWin | RoundPhase::ResolvedLoss)
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "idle"),
            RoundPhase::Betting => write!(f, "betting"),
            RoundPhase::Spinning => write!(f, "spinning"),
            RoundPhase::ResolvedWin => write!(f, "resolved (win)"),
            RoundPhase::ResolvedLoss => write!(f, "resolved (loss)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoundEvent {
    PlaceBet(Bet),
    RemoveBet(usize),
    ClearBets,
    StartSpin,
    Land(ProducedOutcome),
    Reset,
}

impl RoundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoundEvent::PlaceBet(_) => "place-bet",
            RoundEvent::RemoveBet(_) => "remove-bet",
            RoundEvent::ClearBets => "clear-bets",
            RoundEvent::StartSpin => "start-spin",
            RoundEvent::Land(_) => "land",
            RoundEvent::Reset => "reset",
        }
    }
}

/// Everything a round carries besides its phase
#[derive(Debug, Clone, Default)]
pub struct RoundContext {
    pub bets: Vec<Bet>,
    pub outcome: Option<ProducedOutcome>,
    pub settlement: Option<SettlementResult>,
    pub limits: TableLimits,
}

impl RoundContext {
    pub fn new(limits: TableLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }
}

/// Apply `event` to a round in `phase`.
///
/// On error `ctx` is left untouched.
pub fn transition(
    phase: RoundPhase,
    ctx: &mut RoundContext,
    event: RoundEvent,
) -> Result<RoundPhase, GameError> {
    use RoundEvent::*;
    use RoundPhase::*;

    match (phase, event) {
        (Idle | Betting, PlaceBet(bet)) => {
            ctx.limits.check(&ctx.bets, &bet)?;
            ctx.bets.push(bet);
            Ok(Betting)
        }
        (Betting, RemoveBet(index)) => {
            if index >= ctx.bets.len() {
                return Err(GameError::NoSuchBet(index));
            }
            ctx.bets.remove(index);
            Ok(if ctx.bets.is_empty() { Idle } else { Betting })
        }
        (Betting, ClearBets) => {
            ctx.bets.clear();
            Ok(Idle)
        }
        (Idle | Betting, StartSpin) if ctx.bets.is_empty() => Err(GameError::EmptyBetSlip),
        (Betting, StartSpin) => Ok(Spinning),
        (Spinning, Land(produced)) => {
            let settlement = settle(produced.outcome, &ctx.bets);
            let next = if settlement.is_win() { ResolvedWin } else { ResolvedLoss };
            ctx.outcome = Some(produced);
            ctx.settlement = Some(settlement);
            Ok(next)
        }
        (phase, Reset) if phase != Spinning => {
            ctx.bets.clear();
            ctx.outcome = None;
            ctx.settlement = None;
            Ok(Idle)
        }
        (phase, event) => Err(GameError::InvalidTransition {
            phase,
            event: event.name(),
        }),
    }
}

/// A round's phase together with its context
#[derive(Debug, Clone)]
pub struct Round {
    phase: RoundPhase,
    context: RoundContext,
}

impl Round {
    pub fn new(limits: TableLimits) -> Self {
        Self {
            phase: RoundPhase::Idle,
            context: RoundContext::new(limits),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn context(&self) -> &RoundContext {
        &self.context
    }

    pub fn bets(&self) -> &[Bet] {
        &self.context.bets
    }

    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundPhase, GameError> {
        let name = event.name();
        let next = transition(self.phase, &mut self.context, event)?;
        debug!("Round {} --{}--> {}", self.phase, name, next);
        self.phase = next;
        Ok(next)
    }

    pub fn place_bet(&mut self, bet: Bet) -> Result<RoundPhase, GameError> {
        self.apply(RoundEvent::PlaceBet(bet))
    }

    pub fn remove_bet(&mut self, index: usize) -> Result<RoundPhase, GameError> {
        self.apply(RoundEvent::RemoveBet(index))
    }

    pub fn clear_bets(&mut self) -> Result<RoundPhase, GameError> {
        self.apply(RoundEvent::ClearBets)
    }

    pub fn reset(&mut self) -> Result<RoundPhase, GameError> {
        self.apply(RoundEvent::Reset)
    }

    /// Wallet payload debiting the current slip
    pub fn place_bet_payload(&self) -> WalletPayload {
        WalletPayload::PlaceBet {
            amount: total_staked(&self.context.bets),
            bets: self.context.bets.iter().map(Bet::to_wire).collect(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Summary of a resolved round
    pub fn receipt(&self) -> Option<RoundReceipt> {
        let produced = self.context.outcome.as_ref()?;
        let settlement = self.context.settlement.clone()?;
        Some(RoundReceipt {
            round_id: produced.round_id.clone(),
            outcome: produced.outcome,
            source: produced.source,
            settlement,
            total_staked: total_staked(&self.context.bets),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundReceipt {
    pub round_id: RoundId,
    pub outcome: Outcome,
    pub source: Source,
    pub settlement: SettlementResult,
    pub total_staked: f64,
}

impl RoundReceipt {
    pub fn is_win(&self) -> bool {
        self.settlement.is_win()
    }

    /// Claim for the winnings, if there are any
    pub fn claim_payload(&self) -> Option<WalletPayload> {
        self.is_win().then(|| WalletPayload::ClaimWinnings {
            game_id: self.round_id.to_string(),
            amount: self.settlement.total_payout,
            result: self.outcome.value(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}

/// Table that spins rounds with its provider
pub struct RouletteTable {
    provider: OutcomeProvider,
    limits: TableLimits,
}

impl RouletteTable {
    pub fn new(provider: OutcomeProvider, limits: TableLimits) -> Self {
        Self { provider, limits }
    }

    pub fn provider(&self) -> &OutcomeProvider {
        &self.provider
    }

    pub fn limits(&self) -> &TableLimits {
        &self.limits
    }

    pub fn new_round(&self) -> Round {
        Round::new(self.limits.clone())
    }

    /// Spin `round` and settle it
    pub async fn spin(&self, round: &mut Round) -> Result<RoundReceipt, GameError> {
        round.apply(RoundEvent::StartSpin)?;
        info!("Spinning with {} bet(s)", round.bets().len());

        let produced = self.provider.produce_outcome().await;
        round.apply(RoundEvent::Land(produced))?;

        let receipt = round.receipt().ok_or(GameError::InvalidTransition {
            phase: round.phase(),
            event: "land",
        })?;

        info!(
            "Round {} resolved {} on {}: payout {}",
            receipt.round_id,
            if receipt.is_win() { "win" } else { "loss" },
            receipt.outcome,
            receipt.settlement.total_payout
        );
        Ok(receipt)
    }

    pub async fn verify(&self, receipt: &RoundReceipt) -> bool {
        self.provider
            .verify_outcome(&receipt.round_id, i64::from(receipt.outcome.value()))
            .await
    }
}
