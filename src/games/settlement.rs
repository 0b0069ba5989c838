//! Settlement Engine
//!
//! Pure evaluation of a round's bets against its outcome. No I/O, no logging,
//! no hidden state: the same inputs always give the same [`SettlementResult`].

use crate::games::bets::{Bet, BetKind};
use crate::games::wheel::{Color, Outcome};
use serde::{Deserialize, Serialize};

/// Per-bet results for one round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementResult {
    /// Parallel to the input bet sequence
    pub per_bet_win: Vec<bool>,
    /// Stake plus winnings over every winning bet
    pub total_payout: f64,
}

impl SettlementResult {
    /// Round status surfaced to the UI: won iff at least one bet won
    pub fn is_win(&self) -> bool {
        self.per_bet_win.iter().any(|&won| won)
    }

    pub fn winning_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.per_bet_win
            .iter()
            .enumerate()
            .filter_map(|(i, &won)| won.then_some(i))
    }
}

/// Win predicate for a single bet
pub fn is_winning_bet(outcome: Outcome, bet: &Bet) -> bool {
    let n = outcome.value();
    match &bet.kind {
        BetKind::Straight(number) => *number == Some(n),
        BetKind::Red => outcome.color() == Color::Red,
        BetKind::Black => outcome.color() == Color::Black,
        BetKind::Even => n != 0 && n % 2 == 0,
        BetKind::Odd => n != 0 && n % 2 == 1,
        BetKind::High => (19..=36).contains(&n),
        BetKind::Low => (1..=18).contains(&n),
        // No win predicate for the inside/outer-group tags yet
        BetKind::Split(_)
        | BetKind::Street(_)
        | BetKind::Corner(_)
        | BetKind::SixLine(_)
        | BetKind::Dozen(_)
        | BetKind::Column(_)
        | BetKind::Unrecognized(_) => false,
    }
}

/// Amount returned for a winning bet: winnings at the table odds plus the stake.
/// Saturates at `f64::MAX`.
pub fn winning_payout(bet: &Bet) -> f64 {
    let stake = bet.effective_stake();
    (stake * f64::from(bet.kind.multiplier()) + stake).min(f64::MAX)
}

/// Evaluate every bet against `outcome`.
///
/// A bet without a positive stake is malformed history: it never wins and
/// contributes nothing, but it still gets its slot in `per_bet_win`.
pub fn settle(outcome: Outcome, bets: &[Bet]) -> SettlementResult {
    let per_bet_win: Vec<bool> = bets
        .iter()
        .map(|bet| bet.effective_stake() > 0.0 && is_winning_bet(outcome, bet))
        .collect();

    let total_payout = bets
        .iter()
        .zip(&per_bet_win)
        .filter(|(_, won)| **won)
        .map(|(bet, _)| winning_payout(bet))
        .sum::<f64>()
        .min(f64::MAX);

    SettlementResult {
        per_bet_win,
        total_payout,
    }
}

/// Sum of the valid stakes on a slip
pub fn total_staked(bets: &[Bet]) -> f64 {
    bets.iter().map(Bet::effective_stake).sum::<f64>().min(f64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::bets::BetTarget;

    fn outcome(n: u8) -> Outcome {
        Outcome::new(n).expect("wheel value")
    }

    #[test]
    fn test_seventeen_is_black() {
        let result = settle(outcome(17), &[Bet::new(BetKind::Red, 10.0)]);
        assert_eq!(result.per_bet_win, vec![false]);
        assert_eq!(result.total_payout, 0.0);

        let result = settle(outcome(17), &[Bet::new(BetKind::Black, 10.0)]);
        assert_eq!(result.per_bet_win, vec![true]);
        assert_eq!(result.total_payout, 20.0);
    }

    #[test]
    fn test_red_bet_pays_even_money() {
        let result = settle(outcome(19), &[Bet::new(BetKind::Red, 10.0)]);
        assert_eq!(result.per_bet_win, vec![true]);
        assert_eq!(result.total_payout, 20.0);
        assert!(result.is_win());
    }

    #[test]
    fn test_zero_loses_color_bets() {
        let bets = [Bet::new(BetKind::Red, 5.0), Bet::new(BetKind::Black, 5.0)];
        let result = settle(outcome(0), &bets);
        assert_eq!(result.per_bet_win, vec![false, false]);
        assert_eq!(result.total_payout, 0.0);
        assert!(!result.is_win());
    }

    #[test]
    fn test_zero_loses_parity_and_range_bets() {
        let bets = [
            Bet::new(BetKind::Even, 1.0),
            Bet::new(BetKind::Odd, 1.0),
            Bet::new(BetKind::High, 1.0),
            Bet::new(BetKind::Low, 1.0),
        ];
        assert_eq!(settle(outcome(0), &bets).per_bet_win, vec![false; 4]);
    }

    #[test]
    fn test_straight_pays_thirty_five_to_one() {
        let result = settle(outcome(5), &[Bet::straight(5, 1.0)]);
        assert_eq!(result.per_bet_win, vec![true]);
        assert_eq!(result.total_payout, 36.0);
    }

    #[test]
    fn test_even_and_high_both_win_on_twenty() {
        let bets = [Bet::new(BetKind::Even, 10.0), Bet::new(BetKind::High, 10.0)];
        let result = settle(outcome(20), &bets);
        assert_eq!(result.per_bet_win, vec![true, true]);
        assert_eq!(result.total_payout, 40.0);
    }

    #[test]
    fn test_range_boundaries() {
        assert!(is_winning_bet(outcome(18), &Bet::new(BetKind::Low, 1.0)));
        assert!(!is_winning_bet(outcome(19), &Bet::new(BetKind::Low, 1.0)));
        assert!(is_winning_bet(outcome(19), &Bet::new(BetKind::High, 1.0)));
        assert!(is_winning_bet(outcome(36), &Bet::new(BetKind::High, 1.0)));
        assert!(is_winning_bet(outcome(1), &Bet::new(BetKind::Odd, 1.0)));
    }

    #[test]
    fn test_empty_slip() {
        let result = settle(outcome(23), &[]);
        assert!(result.per_bet_win.is_empty());
        assert_eq!(result.total_payout, 0.0);
        assert!(!result.is_win());
    }

    #[test]
    fn test_unevaluated_tags_always_lose() {
        let bets = [
            Bet::new(BetKind::Split(BetTarget::Token("5-8".into())), 1.0),
            Bet::new(BetKind::Dozen(BetTarget::Number(1.0)), 1.0),
            Bet::new(BetKind::Column(BetTarget::Empty), 1.0),
            Bet::new(BetKind::Unrecognized("basket".into()), 1.0),
            Bet::new(BetKind::Straight(None), 1.0),
        ];
        let result = settle(outcome(5), &bets);
        assert_eq!(result.per_bet_win, vec![false; 5]);
        assert_eq!(result.total_payout, 0.0);
    }

    #[test]
    fn test_malformed_stake_never_wins() {
        let bets = [
            Bet::new(BetKind::Red, -10.0),
            Bet::new(BetKind::Red, f64::NAN),
            Bet::new(BetKind::Red, 2.0),
        ];
        let result = settle(outcome(1), &bets);
        assert_eq!(result.per_bet_win, vec![false, false, true]);
        assert_eq!(result.total_payout, 4.0);
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let bets = vec![
            Bet::straight(32, 2.0),
            Bet::new(BetKind::Red, 3.0),
            Bet::new(BetKind::Even, 4.0),
        ];
        let first = settle(outcome(32), &bets);
        let second = settle(outcome(32), &bets);
        assert_eq!(first, second);
        assert_eq!(first.total_payout, 72.0 + 6.0 + 8.0);
        assert_eq!(first.winning_indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_total_staked_ignores_malformed_amounts() {
        let bets = [
            Bet::new(BetKind::Red, 1.5),
            Bet::new(BetKind::Odd, -2.0),
            Bet::straight(3, 0.5),
        ];
        assert_eq!(total_staked(&bets), 2.0);
    }

    #[test]
    fn test_huge_stakes_saturate_instead_of_overflowing() {
        let bets = [Bet::straight(19, f64::MAX / 2.0), Bet::new(BetKind::Red, f64::MAX)];
        let result = settle(outcome(19), &bets);

        assert_eq!(result.per_bet_win, vec![true, true]);
        assert!(result.total_payout.is_finite());
        assert_eq!(result.total_payout, f64::MAX);
        assert_eq!(winning_payout(&bets[0]), f64::MAX);
        assert_eq!(total_staked(&bets), f64::MAX);
    }
}
