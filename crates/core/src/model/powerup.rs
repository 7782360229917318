use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown power-up: {0}")]
pub struct UnknownPowerup(pub String);

/// Time-costed assists available during a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    /// Shows the question's clue text.
    Clue,
    /// Removes two incorrect options.
    FiftyFifty,
    /// Marks the correct option and disables the rest.
    Reveal,
}

impl PowerupKind {
    pub const ALL: [PowerupKind; 3] = [
        PowerupKind::Clue,
        PowerupKind::FiftyFifty,
        PowerupKind::Reveal,
    ];

    #[must_use]
    pub fn cost_minutes(self) -> u32 {
        match self {
            PowerupKind::Clue => 5,
            PowerupKind::FiftyFifty => 10,
            PowerupKind::Reveal => 20,
        }
    }

    #[must_use]
    pub fn cost_secs(self) -> u32 {
        self.cost_minutes() * 60
    }

    /// Stable key used in storage.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            PowerupKind::Clue => "clue",
            PowerupKind::FiftyFifty => "fifty_fifty",
            PowerupKind::Reveal => "reveal",
        }
    }
}

impl fmt::Display for PowerupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PowerupKind::Clue => "Clue",
            PowerupKind::FiftyFifty => "50:50",
            PowerupKind::Reveal => "Reveal",
        })
    }
}

impl FromStr for PowerupKind {
    type Err = UnknownPowerup;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clue" => Ok(PowerupKind::Clue),
            "50:50" | "5050" | "fifty_fifty" => Ok(PowerupKind::FiftyFifty),
            "reveal" => Ok(PowerupKind::Reveal),
            other => Err(UnknownPowerup(other.to_owned())),
        }
    }
}

/// One charged use of a power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerupUse {
    pub question_index: usize,
    pub kind: PowerupKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_are_in_minutes() {
        assert_eq!(PowerupKind::Clue.cost_secs(), 300);
        assert_eq!(PowerupKind::FiftyFifty.cost_secs(), 600);
        assert_eq!(PowerupKind::Reveal.cost_secs(), 1200);
    }

    #[test]
    fn parses_display_names_and_keys() {
        for kind in PowerupKind::ALL {
            assert_eq!(kind.to_string().parse::<PowerupKind>().unwrap(), kind);
            assert_eq!(kind.key().parse::<PowerupKind>().unwrap(), kind);
        }
    }
}
