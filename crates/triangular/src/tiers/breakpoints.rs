use serde::{Deserialize, Serialize};

use super::Tier;

/// Reputation at which a user may graduate regardless of subscription state.
pub const GRADUATION_REPUTATION: u64 = 100_000;

const DEFAULT_SCHEDULE: [(Tier, u64); 6] = [
    (Tier::Bronze, 0),
    (Tier::Silver, 1_000),
    (Tier::Gold, 5_000),
    (Tier::Platinum, 30_000),
    (Tier::Contributor, 100_000),
    (Tier::BusinessOwner, 300_000),
];

/// Immutable reputation schedule. Each step names the minimum reputation of a tier; the
/// boundary belongs to the higher tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(Tier, u64)>", into = "Vec<(Tier, u64)>")]
pub struct TierBreakpoints {
    steps: Vec<(Tier, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BreakpointError {
    #[error("tier schedule is empty")]
    Empty,
    #[error("first tier must start at zero reputation (found {0})")]
    NonZeroFloor(u64),
    #[error("tier minimums must be strictly ascending ({previous} then {next})")]
    NotAscending { previous: u64, next: u64 },
    #[error("tier {0} appears more than once")]
    DuplicateTier(Tier),
}

impl TryFrom<Vec<(Tier, u64)>> for TierBreakpoints {
    type Error = BreakpointError;

    fn try_from(steps: Vec<(Tier, u64)>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<TierBreakpoints> for Vec<(Tier, u64)> {
    fn from(schedule: TierBreakpoints) -> Self {
        schedule.steps
    }
}

/// Snapshot of where a reputation total sits in the schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierStanding {
    pub tier: Tier,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_to_next: Option<u64>,
}

impl TierBreakpoints {
    pub fn new(steps: Vec<(Tier, u64)>) -> Result<Self, BreakpointError> {
        let (_, floor) = steps.first().ok_or(BreakpointError::Empty)?;
        if *floor != 0 {
            return Err(BreakpointError::NonZeroFloor(*floor));
        }

        for (index, window) in steps.windows(2).enumerate() {
            let (_, previous) = window[0];
            let (_, next) = window[1];
            if next <= previous {
                return Err(BreakpointError::NotAscending { previous, next });
            }
            let tier = window[1].0;
            if steps[..=index].iter().any(|(seen, _)| *seen == tier) {
                return Err(BreakpointError::DuplicateTier(tier));
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[(Tier, u64)] {
        &self.steps
    }

    fn position_for(&self, reputation: u64) -> usize {
        self.steps
            .iter()
            .rposition(|(_, minimum)| reputation >= *minimum)
            .unwrap_or(0)
    }

    /// Tier label for a reputation total, recomputed from the schedule every time.
    pub fn tier_for(&self, reputation: u64) -> Tier {
        self.steps[self.position_for(reputation)].0
    }

    /// Percentage through the current tier, interpolated toward the next tier's minimum.
    pub fn progress_within_tier(&self, reputation: u64) -> f64 {
        self.progress_for(self.tier_for(reputation), reputation)
    }

    /// Progress measured against a stored tier label. The top tier always reports 100 and a
    /// label missing from the schedule reports 0.
    pub fn progress_for(&self, tier: Tier, reputation: u64) -> f64 {
        let Some(index) = self.steps.iter().position(|(label, _)| *label == tier) else {
            return 0.0;
        };
        let Some((_, ceiling)) = self.steps.get(index + 1) else {
            return 100.0;
        };
        let floor = self.steps[index].1;

        let span = (*ceiling - floor) as f64;
        let progress = (reputation as f64 - floor as f64) / span * 100.0;
        progress.clamp(0.0, 100.0)
    }

    pub fn standing(&self, reputation: u64) -> TierStanding {
        let index = self.position_for(reputation);
        let tier = self.steps[index].0;
        let next = self.steps.get(index + 1);

        TierStanding {
            tier,
            progress: self.progress_for(tier, reputation),
            next_tier: next.map(|(label, _)| *label),
            points_to_next: next.map(|(_, minimum)| minimum.saturating_sub(reputation)),
        }
    }
}

impl Default for TierBreakpoints {
    fn default() -> Self {
        Self {
            steps: DEFAULT_SCHEDULE.to_vec(),
        }
    }
}

/// Graduation gate, independent of the tier label.
pub fn can_graduate(reputation: u64, has_active_subscription: bool) -> bool {
    reputation >= GRADUATION_REPUTATION || has_active_subscription
}
