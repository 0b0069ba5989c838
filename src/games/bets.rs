//! Bet vocabulary, payout table and bet-entry validation
//!
//! Bets arrive from the UI in a loosely typed JSON shape ([`WireBet`]) and are
//! lifted into the closed [`BetKind`] variant before anything else touches
//! them. Lifting never fails; whatever cannot be understood becomes a bet
//! that can never win, and [`TableLimits::check`] is where such bets get
//! turned away at entry time.

use crate::errors::BetError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Every bet tag the table knows about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetTag {
    Straight,
    Split,
    Street,
    Corner,
    SixLine,
    Dozen,
    Column,
    Red,
    Black,
    Even,
    Odd,
    High,
    Low,
}

impl BetTag {
    pub const ALL: [BetTag; 13] = [
        BetTag::Straight,
        BetTag::Split,
        BetTag::Street,
        BetTag::Corner,
        BetTag::SixLine,
        BetTag::Dozen,
        BetTag::Column,
        BetTag::Red,
        BetTag::Black,
        BetTag::Even,
        BetTag::Odd,
        BetTag::High,
        BetTag::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetTag::Straight => "straight",
            BetTag::Split => "split",
            BetTag::Street => "street",
            BetTag::Corner => "corner",
            BetTag::SixLine => "sixline",
            BetTag::Dozen => "dozen",
            BetTag::Column => "column",
            BetTag::Red => "red",
            BetTag::Black => "black",
            BetTag::Even => "even",
            BetTag::Odd => "odd",
            BetTag::High => "high",
            BetTag::Low => "low",
        }
    }

    /// "To-one" payout odds
    pub fn multiplier(&self) -> u32 {
        match self {
            BetTag::Straight => 35,
            BetTag::Split => 17,
            BetTag::Street => 11,
            BetTag::Corner => 8,
            BetTag::SixLine => 5,
            BetTag::Dozen | BetTag::Column => 2,
            BetTag::Red
            | BetTag::Black
            | BetTag::Even
            | BetTag::Odd
            | BetTag::High
            | BetTag::Low => 1,
        }
    }

    /// Whether a win predicate exists for this tag
    pub fn is_supported(&self) -> bool {
        !matches!(
            self,
            BetTag::Split
                | BetTag::Street
                | BetTag::Corner
                | BetTag::SixLine
                | BetTag::Dozen
                | BetTag::Column
        )
    }
}

impl fmt::Display for BetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetTag {
    type Err = BetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        BetTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == needle)
            .ok_or_else(|| BetError::UnknownBetType(s.to_string()))
    }
}

/// Payout multiplier for a raw tag; unknown tags pay nothing
pub fn payout_multiplier(tag: &str) -> u32 {
    tag.parse::<BetTag>().map(|t| t.multiplier()).unwrap_or(0)
}

/// Target of a bet whose tag has no win predicate yet
#[derive(Debug, Clone, PartialEq)]
pub enum BetTarget {
    Number(f64),
    Token(String),
    Empty,
}

impl BetTarget {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Number(n) => n.as_f64().map(BetTarget::Number).unwrap_or(BetTarget::Empty),
            Value::String(s) => BetTarget::Token(s.clone()),
            Value::Null => BetTarget::Empty,
            other => BetTarget::Token(other.to_string()),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            BetTarget::Number(n) => Value::from(*n),
            BetTarget::Token(s) => Value::String(s.clone()),
            BetTarget::Empty => Value::Null,
        }
    }
}

impl fmt::Display for BetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetTarget::Number(n) => write!(f, "{}", n),
            BetTarget::Token(s) => f.write_str(s),
            BetTarget::Empty => f.write_str("-"),
        }
    }
}

/// What a bet is on
#[derive(Debug, Clone, PartialEq)]
pub enum BetKind {
    /// Single number; `None` when the submitted number was not a wheel value
    Straight(Option<u8>),
    Split(BetTarget),
    Street(BetTarget),
    Corner(BetTarget),
    SixLine(BetTarget),
    Dozen(BetTarget),
    Column(BetTarget),
    Red,
    Black,
    Even,
    Odd,
    High,
    Low,
    /// Tag outside the vocabulary, kept verbatim
    Unrecognized(String),
}

impl BetKind {
    pub fn tag(&self) -> Option<BetTag> {
        let tag = match self {
            BetKind::Straight(_) => BetTag::Straight,
            BetKind::Split(_) => BetTag::Split,
            BetKind::Street(_) => BetTag::Street,
            BetKind::Corner(_) => BetTag::Corner,
            BetKind::SixLine(_) => BetTag::SixLine,
            BetKind::Dozen(_) => BetTag::Dozen,
            BetKind::Column(_) => BetTag::Column,
            BetKind::Red => BetTag::Red,
            BetKind::Black => BetTag::Black,
            BetKind::Even => BetTag::Even,
            BetKind::Odd => BetTag::Odd,
            BetKind::High => BetTag::High,
            BetKind::Low => BetTag::Low,
            BetKind::Unrecognized(_) => return None,
        };
        Some(tag)
    }

    pub fn multiplier(&self) -> u32 {
        self.tag().map(|t| t.multiplier()).unwrap_or(0)
    }

    fn tag_str(&self) -> &str {
        match self {
            BetKind::Unrecognized(raw) => raw,
            other => other.tag().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    fn from_tag(tag: BetTag, value: &Value) -> Self {
        match tag {
            BetTag::Straight => BetKind::Straight(straight_number(value)),
            BetTag::Split => BetKind::Split(BetTarget::from_value(value)),
            BetTag::Street => BetKind::Street(BetTarget::from_value(value)),
            BetTag::Corner => BetKind::Corner(BetTarget::from_value(value)),
            BetTag::SixLine => BetKind::SixLine(BetTarget::from_value(value)),
            BetTag::Dozen => BetKind::Dozen(BetTarget::from_value(value)),
            BetTag::Column => BetKind::Column(BetTarget::from_value(value)),
            BetTag::Red => BetKind::Red,
            BetTag::Black => BetKind::Black,
            BetTag::Even => BetKind::Even,
            BetTag::Odd => BetKind::Odd,
            BetTag::High => BetKind::High,
            BetTag::Low => BetKind::Low,
        }
    }

    fn value(&self) -> Value {
        match self {
            BetKind::Straight(Some(n)) => Value::from(*n),
            BetKind::Split(t)
            | BetKind::Street(t)
            | BetKind::Corner(t)
            | BetKind::SixLine(t)
            | BetKind::Dozen(t)
            | BetKind::Column(t) => t.to_value(),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetKind::Straight(Some(n)) => write!(f, "Number {}", n),
            BetKind::Straight(None) => write!(f, "Number ?"),
            BetKind::Red => write!(f, "Red"),
            BetKind::Black => write!(f, "Black"),
            BetKind::Even => write!(f, "Even"),
            BetKind::Odd => write!(f, "Odd"),
            BetKind::High => write!(f, "19-36"),
            BetKind::Low => write!(f, "1-18"),
            BetKind::Unrecognized(raw) => write!(f, "{} (unknown)", raw),
            BetKind::Split(t)
            | BetKind::Street(t)
            | BetKind::Corner(t)
            | BetKind::SixLine(t)
            | BetKind::Dozen(t)
            | BetKind::Column(t) => write!(f, "{}", t),
        }
    }
}

/// A wager placed on the table
#[derive(Debug, Clone, PartialEq)]
pub struct Bet {
    pub kind: BetKind,
    /// Stake as submitted; may be non-positive or NaN for malformed history
    pub amount: f64,
}

impl Bet {
    pub fn new(kind: BetKind, amount: f64) -> Self {
        Self { kind, amount }
    }

    pub fn straight(number: u8, amount: f64) -> Self {
        Self::new(BetKind::Straight(Some(number).filter(|n| *n <= 36)), amount)
    }

    /// Stake used for payout math; malformed amounts count as zero
    pub fn effective_stake(&self) -> f64 {
        if self.amount.is_finite() && self.amount > 0.0 {
            self.amount
        } else {
            0.0
        }
    }

    /// Lift a UI bet into the typed form. Never fails.
    pub fn from_wire(wire: &WireBet) -> Self {
        let kind = match wire.bet_type.parse::<BetTag>() {
            Ok(tag) => BetKind::from_tag(tag, &wire.value),
            Err(_) => BetKind::Unrecognized(wire.bet_type.clone()),
        };
        let amount = numeric_value(&wire.amount).unwrap_or(f64::NAN);
        Self { kind, amount }
    }

    pub fn to_wire(&self) -> WireBet {
        WireBet {
            bet_type: self.kind.tag_str().to_string(),
            value: self.kind.value(),
            amount: Value::from(self.amount),
        }
    }
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}",
            self.kind.tag_str().to_uppercase(),
            self.kind,
            format_amount(self.amount)
        )
    }
}

/// Parses the command-line shorthand `tag:amount` or `tag:value:amount`
impl FromStr for Bet {
    type Err = BetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let (tag, value, amount) = match parts.as_slice() {
            [tag, amount] => (*tag, Value::Null, *amount),
            [tag, value, amount] => (*tag, Value::String(value.to_string()), *amount),
            _ => return Err(BetError::Unparsable(s.to_string())),
        };
        let amount: f64 = amount
            .parse()
            .map_err(|_| BetError::Unparsable(s.to_string()))?;

        Ok(Bet::from_wire(&WireBet {
            bet_type: tag.to_string(),
            value,
            amount: Value::from(amount),
        }))
    }
}

/// JSON shape the betting panel produces: `{"type": "straight", "value": 17, "amount": 1.5}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireBet {
    #[serde(rename = "type")]
    pub bet_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(default)]
    pub amount: Value,
}

/// Numeric reading of a loosely typed JSON value (numbers and numeric strings)
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn straight_number(value: &Value) -> Option<u8> {
    numeric_value(value)
        .filter(|n| n.fract() == 0.0 && (0.0..=36.0).contains(n))
        .map(|n| n as u8)
}

/// Render an amount the way the wallet displays it
pub fn format_amount(amount: f64) -> String {
    format!("{:.4}", amount)
}

/// Bet-entry limits for a table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableLimits {
    pub min_stake: f64,
    pub max_stake: f64,
    pub max_bets: usize,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            min_stake: 0.0001,
            max_stake: 1_000.0,
            max_bets: 20,
        }
    }
}

impl TableLimits {
    /// Validate `bet` before it joins `slip`
    pub fn check(&self, slip: &[Bet], bet: &Bet) -> Result<(), BetError> {
        match &bet.kind {
            BetKind::Unrecognized(raw) => return Err(BetError::UnknownBetType(raw.clone())),
            BetKind::Straight(None) => return Err(BetError::InvalidStraightNumber),
            kind => {
                if let Some(tag) = kind.tag().filter(|t| !t.is_supported()) {
                    return Err(BetError::UnsupportedBetType(tag));
                }
            }
        }

        if !(bet.amount.is_finite() && bet.amount > 0.0) {
            return Err(BetError::NonPositiveStake(bet.amount));
        }
        if bet.amount < self.min_stake {
            return Err(BetError::BelowMinimum { stake: bet.amount, min: self.min_stake });
        }
        if bet.amount > self.max_stake {
            return Err(BetError::AboveMaximum { stake: bet.amount, max: self.max_stake });
        }
        if slip.len() >= self.max_bets {
            return Err(BetError::TooManyBets { max: self.max_bets });
        }

        Ok(())
    }
}
