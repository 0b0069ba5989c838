//! Full round: wallet debit, attested spin, settlement, claim and verification

use async_trait::async_trait;
use roulette::errors::{ServiceError, WalletError};
use roulette::games::bets::BetKind;
use roulette::games::types::ProcessMessage;
use roulette::games::TableLimits;
use roulette::{
    settle, Bet, InMemoryWallet, OutcomeProvider, RandomnessService, RouletteTable, RoundPhase,
    Source, VrfProcess, WalletCollaborator,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

struct Unreachable;

#[async_trait]
impl RandomnessService for Unreachable {
    async fn send(&self, _message: &ProcessMessage) -> Result<Value, ServiceError> {
        Err(ServiceError::Unavailable("no route to host".to_string()))
    }
}

fn outside_bets() -> Vec<Bet> {
    vec![
        Bet::new(BetKind::Red, 10.0),
        Bet::new(BetKind::Black, 10.0),
        Bet::straight(0, 1.0),
    ]
}

#[tokio::test]
async fn test_attested_round_settles_and_pays_out() {
    let process = Arc::new(VrfProcess::with_random_key("proc-table-1"));
    let provider = OutcomeProvider::new(
        Some("proc-table-1".to_string()),
        Some(process.clone()),
        Duration::from_secs(1),
    );
    let table = RouletteTable::new(provider, TableLimits::default());
    let wallet = InMemoryWallet::new(100.0);

    let mut round = table.new_round();
    for bet in outside_bets() {
        round.place_bet(bet).unwrap();
    }
    assert_eq!(round.phase(), RoundPhase::Betting);

    wallet.submit(round.place_bet_payload()).await.unwrap();
    assert_eq!(wallet.balance().await, 79.0);

    let receipt = table.spin(&mut round).await.unwrap();
    assert_eq!(receipt.source, Source::External);
    assert_eq!(receipt.total_staked, 21.0);
    assert_eq!(receipt.settlement, settle(receipt.outcome, &outside_bets()));
    assert_eq!(process.record(&receipt.round_id).unwrap().outcome, receipt.outcome);

    // Red and black cover every pocket but zero, and the straight covers zero
    assert!(receipt.is_win());
    let expected_payout = if receipt.outcome.value() == 0 { 36.0 } else { 20.0 };
    assert_eq!(receipt.settlement.total_payout, expected_payout);

    let claim = receipt.claim_payload().unwrap();
    wallet.submit(claim).await.unwrap();
    assert_eq!(wallet.balance().await, 79.0 + expected_payout);

    assert!(table.verify(&receipt).await);
    let forged = roulette::RoundReceipt {
        outcome: roulette::Outcome::from_position(receipt.outcome.pocket_index() as u64 + 1),
        ..receipt.clone()
    };
    assert!(!table.verify(&forged).await);

    assert_eq!(round.reset().unwrap(), RoundPhase::Idle);
    assert!(round.bets().is_empty());
}

#[tokio::test]
async fn test_unreachable_process_falls_back_but_cannot_attest() {
    let provider = OutcomeProvider::new(
        Some("proc-table-2".to_string()),
        Some(Arc::new(Unreachable)),
        Duration::from_millis(100),
    );
    let table = RouletteTable::new(provider, TableLimits::default());

    let mut round = table.new_round();
    round.place_bet(Bet::new(BetKind::Even, 5.0)).unwrap();

    let receipt = table.spin(&mut round).await.unwrap();
    assert_eq!(receipt.source, Source::Local);
    assert_eq!(receipt.settlement, settle(receipt.outcome, round.bets()));

    // Fail closed: the process is configured but cannot vouch for the result
    assert!(!table.verify(&receipt).await);
}

#[tokio::test]
async fn test_wallet_refuses_stake_above_balance() {
    let table = RouletteTable::new(OutcomeProvider::local_only(), TableLimits::default());
    let wallet = InMemoryWallet::new(5.0);

    let mut round = table.new_round();
    round.place_bet(Bet::new(BetKind::Odd, 10.0)).unwrap();

    assert!(matches!(
        wallet.submit(round.place_bet_payload()).await,
        Err(WalletError::InsufficientFunds { .. })
    ));
    assert_eq!(wallet.balance().await, 5.0);
    assert!(wallet.entries().await.is_empty());
    assert_eq!(round.phase(), RoundPhase::Betting);
}
