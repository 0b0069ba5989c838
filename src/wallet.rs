//! Wallet collaborator
//!
//! The roulette core never moves funds itself. Callers hand the payloads built
//! by a round to a [`WalletCollaborator`], which signs and submits them.

use crate::errors::WalletError;
use crate::games::bets::{format_amount, WireBet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Data submitted to the wallet, tagged with the action it performs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WalletPayload {
    #[serde(rename_all = "camelCase")]
    PlaceBet {
        amount: f64,
        bets: Vec<WireBet>,
        timestamp: i64,
    },
    #[serde(rename_all = "camelCase")]
    ClaimWinnings {
        game_id: String,
        amount: f64,
        result: u8,
        timestamp: i64,
    },
}

#[async_trait]
pub trait WalletCollaborator: Send + Sync {
    async fn get_address(&self) -> Result<String, WalletError>;

    /// Balance as a decimal string
    async fn get_balance(&self, address: &str) -> Result<String, WalletError>;

    /// Sign and submit `payload`, returning the transaction id
    async fn submit(&self, payload: WalletPayload) -> Result<String, WalletError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub tx_id: String,
    pub payload: WalletPayload,
    pub balance_after: f64,
}

#[derive(Debug, Default)]
struct Ledger {
    balance: f64,
    entries: Vec<LedgerEntry>,
    claimed: HashMap<String, String>,
}

/// Single-address wallet that keeps its balance in memory
pub struct InMemoryWallet {
    address: String,
    ledger: RwLock<Ledger>,
}

impl InMemoryWallet {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            address: format!("local-{}", Uuid::new_v4().simple()),
            ledger: RwLock::new(Ledger {
                balance: initial_balance,
                ..Default::default()
            }),
        }
    }

    pub async fn balance(&self) -> f64 {
        self.ledger.read().await.balance
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.ledger.read().await.entries.clone()
    }
}

#[async_trait]
impl WalletCollaborator for InMemoryWallet {
    async fn get_address(&self) -> Result<String, WalletError> {
        Ok(self.address.clone())
    }

    async fn get_balance(&self, address: &str) -> Result<String, WalletError> {
        if address != self.address {
            return Err(WalletError::Rejected(format!("unknown address {}", address)));
        }
        Ok(format_amount(self.balance().await))
    }

    async fn submit(&self, payload: WalletPayload) -> Result<String, WalletError> {
        let mut ledger = self.ledger.write().await;

        let balance_after = match &payload {
            WalletPayload::PlaceBet { amount, bets, .. } => {
                if !(amount.is_finite() && *amount > 0.0) || bets.is_empty() {
                    return Err(WalletError::InvalidAmount(amount.to_string()));
                }
                if *amount > ledger.balance {
                    return Err(WalletError::InsufficientFunds {
                        needed: format_amount(*amount),
                        available: format_amount(ledger.balance),
                    });
                }
                ledger.balance - amount
            }
            WalletPayload::ClaimWinnings { game_id, amount, .. } => {
                if game_id.is_empty() {
                    return Err(WalletError::UnknownGame(game_id.clone()));
                }
                if !(amount.is_finite() && *amount > 0.0) {
                    return Err(WalletError::InvalidAmount(amount.to_string()));
                }
                if let Some(tx_id) = ledger.claimed.get(game_id) {
                    return Err(WalletError::Rejected(format!(
                        "winnings for {} already claimed in {}",
                        game_id, tx_id
                    )));
                }
                ledger.balance + amount
            }
        };

        let tx_id = Uuid::new_v4().to_string();
        if let WalletPayload::ClaimWinnings { game_id, .. } = &payload {
            ledger.claimed.insert(game_id.clone(), tx_id.clone());
        }

        info!(
            "Wallet {} tx {}: balance {}",
            self.address,
            tx_id,
            format_amount(balance_after)
        );
        ledger.balance = balance_after;
        ledger.entries.push(LedgerEntry {
            tx_id: tx_id.clone(),
            payload,
            balance_after,
        });

        Ok(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::bets::{Bet, BetKind};
    use serde_json::json;

    fn place(amount: f64) -> WalletPayload {
        WalletPayload::PlaceBet {
            amount,
            bets: vec![Bet::new(BetKind::Red, amount).to_wire()],
            timestamp: 1,
        }
    }

    fn claim(game_id: &str, amount: f64) -> WalletPayload {
        WalletPayload::ClaimWinnings {
            game_id: game_id.to_string(),
            amount,
            result: 19,
            timestamp: 2,
        }
    }

    #[test]
    fn test_payload_json_shape() {
        assert_eq!(
            serde_json::to_value(place(10.0)).unwrap(),
            json!({
                "action": "placeBet",
                "amount": 10.0,
                "bets": [{"type": "red", "amount": 10.0}],
                "timestamp": 1
            })
        );
        assert_eq!(
            serde_json::to_value(claim("round-1", 20.0)).unwrap(),
            json!({
                "action": "claimWinnings",
                "gameId": "round-1",
                "amount": 20.0,
                "result": 19,
                "timestamp": 2
            })
        );
    }

    #[tokio::test]
    async fn test_bet_then_claim() {
        let wallet = InMemoryWallet::new(100.0);
        let address = wallet.get_address().await.unwrap();
        assert_eq!(wallet.get_balance(&address).await.unwrap(), "100.0000");

        wallet.submit(place(10.0)).await.unwrap();
        assert_eq!(wallet.balance().await, 90.0);

        wallet.submit(claim("round-1", 20.0)).await.unwrap();
        assert_eq!(wallet.get_balance(&address).await.unwrap(), "110.0000");
        assert_eq!(wallet.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn test_refuses_stake_above_balance() {
        let wallet = InMemoryWallet::new(5.0);
        assert_eq!(
            wallet.submit(place(10.0)).await,
            Err(WalletError::InsufficientFunds {
                needed: "10.0000".to_string(),
                available: "5.0000".to_string(),
            })
        );
        assert_eq!(wallet.balance().await, 5.0);
        assert!(wallet.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_claims_are_single_use() {
        let wallet = InMemoryWallet::new(0.0);
        wallet.submit(claim("round-1", 3.0)).await.unwrap();
        assert!(matches!(
            wallet.submit(claim("round-1", 3.0)).await,
            Err(WalletError::Rejected(_))
        ));
        assert_eq!(wallet.balance().await, 3.0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_amounts() {
        let wallet = InMemoryWallet::new(10.0);
        assert!(matches!(
            wallet.submit(place(0.0)).await,
            Err(WalletError::InvalidAmount(_))
        ));
        assert!(matches!(
            wallet.submit(claim("round-1", f64::NAN)).await,
            Err(WalletError::InvalidAmount(_))
        ));
        assert!(matches!(
            wallet.submit(claim("", 1.0)).await,
            Err(WalletError::UnknownGame(_))
        ));
        assert!(wallet.get_balance("someone-else").await.is_err());
    }
}
