use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{ApplicationId, OpportunityId, UserId};
use crate::tiers::Tier;

/// Sub-platform an opportunity is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    HuseCircle,
    Dofracto,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Draft,
    #[default]
    Active,
    Closed,
    Filled,
    Cancelled,
}

impl OpportunityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OpportunityStatus::Draft => "draft",
            OpportunityStatus::Active => "active",
            OpportunityStatus::Closed => "closed",
            OpportunityStatus::Filled => "filled",
            OpportunityStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Zero means unlimited.
    pub max_applicants: u32,
    pub require_resume: bool,
    pub require_portfolio: bool,
}

/// Denormalized counters. Only the stats aggregator and view tracking write these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OpportunityStats {
    pub views: u64,
    pub applications: u32,
    pub shortlisted: u32,
    pub hired: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub posted_by: UserId,
    pub title: String,
    pub platform: Platform,
    pub min_tier: Tier,
    pub application_settings: ApplicationSettings,
    pub status: OpportunityStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub stats: OpportunityStats,
    pub created_at: DateTime<Utc>,
}

/// Poster-provided content for a new opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpportunityDraft {
    pub title: String,
    pub platform: Platform,
    #[serde(default)]
    pub min_tier: Tier,
    #[serde(default)]
    pub application_settings: ApplicationSettings,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl Opportunity {
    pub fn from_draft(posted_by: UserId, draft: OpportunityDraft) -> Self {
        let mut opportunity =
            Self::new(OpportunityId::generate(), posted_by, draft.title, draft.platform);
        opportunity.min_tier = draft.min_tier;
        opportunity.application_settings = draft.application_settings;
        opportunity.deadline = draft.deadline;
        opportunity
    }

    pub fn new(
        id: OpportunityId,
        posted_by: UserId,
        title: impl Into<String>,
        platform: Platform,
    ) -> Self {
        Self {
            id,
            posted_by,
            title: title.into(),
            platform,
            min_tier: Tier::Bronze,
            application_settings: ApplicationSettings::default(),
            status: OpportunityStatus::Active,
            deadline: None,
            stats: OpportunityStats::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|deadline| now > deadline).unwrap_or(false)
    }

    pub fn is_full(&self) -> bool {
        let max = self.application_settings.max_applicants;
        max > 0 && self.stats.applications >= max
    }

    /// Close an active opportunity whose deadline has passed. One-way: nothing reopens it.
    /// Returns true when the status changed.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == OpportunityStatus::Active && self.is_expired(now) {
            self.status = OpportunityStatus::Closed;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewing,
    Shortlisted,
    Interview,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Statuses counted in `OpportunityStats::shortlisted`.
    pub const fn counts_as_shortlisted(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Shortlisted | ApplicationStatus::Interview | ApplicationStatus::Accepted
        )
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        match self {
            Pending => matches!(next, Reviewing | Shortlisted | Rejected | Withdrawn),
            Reviewing => matches!(next, Shortlisted | Interview | Rejected | Withdrawn),
            Shortlisted => matches!(next, Interview | Accepted | Rejected | Withdrawn),
            Interview => matches!(next, Accepted | Rejected | Withdrawn),
            Accepted | Rejected | Withdrawn => false,
        }
    }
}

/// Applicant-provided content for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplicationDraft {
    pub cover_letter: String,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub portfolio_url: Option<String>,
}

/// Unique per (opportunity, applicant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub opportunity_id: OpportunityId,
    pub applicant_id: UserId,
    pub cover_letter: String,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub status_updated_at: Option<DateTime<Utc>>,
}
