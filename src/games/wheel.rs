//! European wheel layout, pocket colors and the round outcome type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of pockets on a European wheel
pub const WHEEL_SIZE: usize = 37;

/// Physical pocket order, clockwise from zero
pub const WHEEL_LAYOUT: [u8; WHEEL_SIZE] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

/// Red pockets; every other non-zero pocket is black
pub const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Pocket color
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
    Green,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
            Color::Green => write!(f, "green"),
        }
    }
}

/// Color of a wheel value. Zero is green.
pub fn color_of(number: u8) -> Color {
    if number == 0 {
        Color::Green
    } else if RED_NUMBERS.contains(&number) {
        Color::Red
    } else {
        Color::Black
    }
}

/// Whether `number` is one of the 37 wheel values
pub fn is_wheel_value(number: i64) -> bool {
    u8::try_from(number)
        .map(|n| WHEEL_LAYOUT.contains(&n))
        .unwrap_or(false)
}

/// The wheel value a round landed on.
///
/// Can only be built from a value present in [`WHEEL_LAYOUT`], so holding an
/// `Outcome` is proof the value is in 0..=36.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Outcome(u8);

impl Outcome {
    pub fn new(number: u8) -> Option<Self> {
        WHEEL_LAYOUT.contains(&number).then_some(Self(number))
    }

    /// Map a service-supplied position onto the wheel (`position mod 37`)
    pub fn from_position(position: u64) -> Self {
        Self(WHEEL_LAYOUT[(position % WHEEL_SIZE as u64) as usize])
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn color(&self) -> Color {
        color_of(self.0)
    }

    /// Index of this value in [`WHEEL_LAYOUT`], used to stop the wheel on the right pocket
    pub fn pocket_index(&self) -> usize {
        WHEEL_LAYOUT
            .iter()
            .position(|&n| n == self.0)
            .unwrap_or_default()
    }
}

impl TryFrom<u8> for Outcome {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Outcome::new(value).ok_or_else(|| format!("{} is not a wheel value", value))
    }
}

impl From<Outcome> for u8 {
    fn from(outcome: Outcome) -> Self {
        outcome.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.color())
    }
}
