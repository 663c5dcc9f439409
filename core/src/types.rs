//! Shared primitive types and categorical dimensions used across the pipeline.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Customers are numbered 1..=n within a run.
pub type CustomerId = u32;

/// Campaign identifier, e.g. `C001`.
pub type CampaignId = String;

/// The canonical run identifier.
pub type RunId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }
}

impl FromStr for LoyaltyTier {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bronze" => Ok(Self::Bronze),
            "Silver" => Ok(Self::Silver),
            "Gold" => Ok(Self::Gold),
            "Platinum" => Ok(Self::Platinum),
            _ => Err(unknown("loyalty tier", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    East,
    West,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
        }
    }
}

impl FromStr for Region {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "North" => Ok(Self::North),
            "South" => Ok(Self::South),
            "East" => Ok(Self::East),
            "West" => Ok(Self::West),
            _ => Err(unknown("region", s)),
        }
    }
}

/// Marketing delivery channel. Also used for a customer's stated preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    Email,
    #[serde(rename = "SMS")]
    Sms,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Sms => "SMS",
            Self::Push => "Push",
        }
    }
}

impl FromStr for Channel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Email" => Ok(Self::Email),
            "SMS" => Ok(Self::Sms),
            "Push" => Ok(Self::Push),
            _ => Err(unknown("channel", s)),
        }
    }
}

/// Customer lifecycle state. Campaigns target exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lifecycle {
    New,
    Active,
    Warm,
    Lapsed,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Active => "Active",
            Self::Warm => "Warm",
            Self::Lapsed => "Lapsed",
        }
    }
}

impl FromStr for Lifecycle {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "Active" => Ok(Self::Active),
            "Warm" => Ok(Self::Warm),
            "Lapsed" => Ok(Self::Lapsed),
            _ => Err(unknown("lifecycle", s)),
        }
    }
}

/// Where a purchase happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SalesChannel {
    Store,
    Online,
}

impl SalesChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "Store",
            Self::Online => "Online",
        }
    }
}

impl FromStr for SalesChannel {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Store" => Ok(Self::Store),
            "Online" => Ok(Self::Online),
            _ => Err(unknown("sales channel", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityReason {
    RulesPass,
    RulesFail,
}

impl EligibilityReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RulesPass => "rules_pass",
            Self::RulesFail => "rules_fail",
        }
    }
}

impl FromStr for EligibilityReason {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rules_pass" => Ok(Self::RulesPass),
            "rules_fail" => Ok(Self::RulesFail),
            _ => Err(unknown("eligibility reason", s)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),* $(,)?) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        })*
    };
}

display_as_str!(LoyaltyTier, Region, Channel, Lifecycle, SalesChannel, EligibilityReason);

fn unknown(kind: &'static str, value: &str) -> SimError {
    SimError::UnknownCategory {
        kind,
        value: value.to_string(),
    }
}

/// Segment label used for segment-level KPIs, e.g. `"Warm | Gold"`.
pub fn segment_name(lifecycle: Lifecycle, tier: LoyaltyTier) -> String {
    format!("{} | {}", lifecycle, tier)
}
