use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SpaceOptError;
use crate::value_error;

/// Whether we are minimizing or maximizing the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Objective {
    Minimize,
    Maximize,
}

impl Objective {
    /// Every accepted spelling, verbose forms first.
    pub const TOKENS: [&'static str; 4] = ["maximize", "minimize", "max", "min"];

    /// Candidates are ranked ascending by predicted score when minimizing.
    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::Minimize)
    }

    /// Whether `candidate` beats `incumbent` under this direction.
    pub fn improves(&self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimize => "minimize",
            Self::Maximize => "maximize",
        }
    }
}

impl FromStr for Objective {
    type Err = SpaceOptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimize" | "min" => Ok(Self::Minimize),
            "maximize" | "max" => Ok(Self::Maximize),
            _ => Err(value_error!(
                "objective should be one of: {}.",
                Self::TOKENS.join(", ")
            )),
        }
    }
}

impl TryFrom<String> for Objective {
    type Error = SpaceOptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Objective> for String {
    fn from(value: Objective) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_verbose_and_short_tokens() {
        assert_eq!("min".parse::<Objective>().unwrap(), Objective::Minimize);
        assert_eq!("minimize".parse::<Objective>().unwrap(), Objective::Minimize);
        assert_eq!("max".parse::<Objective>().unwrap(), Objective::Maximize);
        assert_eq!("maximize".parse::<Objective>().unwrap(), Objective::Maximize);
    }

    #[test]
    fn unknown_token_is_value_error() {
        let err = "maxi".parse::<Objective>().unwrap_err();
        assert!(err.is_value());
        assert_eq!(
            err.to_string(),
            "objective should be one of: maximize, minimize, max, min."
        );
    }

    #[test]
    fn sort_direction_and_improvement() {
        assert!(Objective::Minimize.is_ascending());
        assert!(!Objective::Maximize.is_ascending());
        assert!(Objective::Minimize.improves(0.1, 0.2));
        assert!(Objective::Maximize.improves(0.3, 0.2));
    }

    #[test]
    fn serde_uses_tokens() {
        let parsed: Objective = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(parsed, Objective::Maximize);
        assert_eq!(serde_json::to_string(&Objective::Minimize).unwrap(), "\"minimize\"");
        assert!(serde_json::from_str::<Objective>("\"up\"").is_err());
    }
}
