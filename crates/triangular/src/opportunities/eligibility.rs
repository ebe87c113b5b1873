use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Opportunity, OpportunityStatus, Platform};
use crate::tiers::{meets_minimum, Tier};
use crate::users::User;

/// First gate check an applicant failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibleReason {
    #[error("opportunity is {}", .status.label())]
    NotActive { status: OpportunityStatus },
    #[error("opportunity deadline {deadline} has passed")]
    Expired { deadline: DateTime<Utc> },
    #[error("opportunity reached its limit of {max_applicants} applicants")]
    AtCapacity { max_applicants: u32 },
    #[error("tier {held} is below the required {required}")]
    TierTooLow { required: Tier, held: Tier },
    #[error("user lacks access to the {platform:?} platform")]
    PlatformAccess { platform: Platform },
}

/// Evaluate the gate in fixed order; the first failing check wins.
pub fn check_eligibility(
    opportunity: &Opportunity,
    user: &User,
    now: DateTime<Utc>,
) -> Result<(), IneligibleReason> {
    if opportunity.status != OpportunityStatus::Active {
        return Err(IneligibleReason::NotActive {
            status: opportunity.status,
        });
    }

    if let Some(deadline) = opportunity.deadline {
        if opportunity.is_expired(now) {
            return Err(IneligibleReason::Expired { deadline });
        }
    }

    if opportunity.is_full() {
        return Err(IneligibleReason::AtCapacity {
            max_applicants: opportunity.application_settings.max_applicants,
        });
    }

    if !meets_minimum(user.tier, opportunity.min_tier) {
        return Err(IneligibleReason::TierTooLow {
            required: opportunity.min_tier,
            held: user.tier,
        });
    }

    let has_access = match opportunity.platform {
        Platform::HuseCircle => user.platforms.huse_circle,
        Platform::Dofracto => user.platforms.dofracto,
        Platform::Both => true,
    };
    if !has_access {
        return Err(IneligibleReason::PlatformAccess {
            platform: opportunity.platform,
        });
    }

    Ok(())
}

pub fn can_apply(opportunity: &Opportunity, user: &User, now: DateTime<Utc>) -> bool {
    check_eligibility(opportunity, user, now).is_ok()
}
