//! Tier labels plus the two distinct orderings over them.
//!
//! [`TierBreakpoints`] maps a reputation total to a tier label. [`ACCESS_ORDER`] ranks labels for
//! access control (opportunity gates and quote requirements). Retuning the reputation schedule
//! must never change access-control ranks, so the two tables stay separate.

mod access;
mod breakpoints;

pub use access::{access_rank, meets_minimum, ACCESS_ORDER};
pub use breakpoints::{
    can_graduate, BreakpointError, TierBreakpoints, TierStanding, GRADUATION_REPUTATION,
};

use serde::{Deserialize, Serialize};

/// Standing label stored on a user. Deliberately carries no `Ord`: compare through
/// [`access_rank`] or [`TierBreakpoints`] depending on the question being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Contributor,
    BusinessOwner,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Contributor => "contributor",
            Tier::BusinessOwner => "business_owner",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bronze" => Some(Tier::Bronze),
            "silver" => Some(Tier::Silver),
            "gold" => Some(Tier::Gold),
            "platinum" => Some(Tier::Platinum),
            "contributor" => Some(Tier::Contributor),
            "business_owner" => Some(Tier::BusinessOwner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
