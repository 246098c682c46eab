//! Debate stances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DebateError;

/// One of the two fixed debate positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    /// Arguing in favor of the topic.
    Pro,
    /// Arguing against the topic.
    Con,
}

impl Stance {
    pub const ALL: [Stance; 2] = [Stance::Pro, Stance::Con];

    /// Wire name used in prompts and schemas.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Pro => "pro",
            Stance::Con => "con",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stance::Pro => "Pro",
            Stance::Con => "Con",
        }
    }

    pub fn opposite(&self) -> Stance {
        match self {
            Stance::Pro => Stance::Con,
            Stance::Con => Stance::Pro,
        }
    }

    /// Parse a stance named by `field`, reporting failures against that field.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, DebateError> {
        match value {
            "pro" => Ok(Stance::Pro),
            "con" => Ok(Stance::Con),
            other => Err(DebateError::validation(
                field,
                format!("expected \"pro\" or \"con\", got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stance::parse_field("stance", s)
    }
}
