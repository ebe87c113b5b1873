use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{QuoteId, QuoteRequestId, UserId};
use crate::tiers::Tier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuoteRequirements {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Option<ExperienceLevel>,
    /// Missing means bronze.
    #[serde(default)]
    pub min_tier: Option<Tier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_flexible")]
    pub flexible: bool,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            currency: default_currency(),
            flexible: true,
        }
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_flexible() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteRequestStatus {
    #[default]
    Open,
    InReview,
    Awarded,
    Completed,
    Cancelled,
}

impl QuoteRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuoteRequestStatus::Open => "open",
            QuoteRequestStatus::InReview => "in_review",
            QuoteRequestStatus::Awarded => "awarded",
            QuoteRequestStatus::Completed => "completed",
            QuoteRequestStatus::Cancelled => "cancelled",
        }
    }

    pub const fn accepts_quotes(self) -> bool {
        matches!(self, QuoteRequestStatus::Open)
    }

    pub const fn can_award(self) -> bool {
        matches!(self, QuoteRequestStatus::Open | QuoteRequestStatus::InReview)
    }
}

/// Requester-provided content for a new quote request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequestDraft {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub requirements: QuoteRequirements,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub id: QuoteRequestId,
    pub requester: UserId,
    pub title: String,
    pub category: String,
    pub requirements: QuoteRequirements,
    pub budget: Budget,
    pub deadline: Option<DateTime<Utc>>,
    pub status: QuoteRequestStatus,
    pub selected_quote: Option<QuoteId>,
    pub quotes_received: u32,
    pub created_at: DateTime<Utc>,
}

impl QuoteRequest {
    pub fn from_draft(requester: UserId, draft: QuoteRequestDraft) -> Self {
        Self {
            id: QuoteRequestId::generate(),
            requester,
            title: draft.title,
            category: draft.category,
            requirements: draft.requirements,
            budget: draft.budget,
            deadline: draft.deadline,
            status: QuoteRequestStatus::Open,
            selected_quote: None,
            quotes_received: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|deadline| now > deadline).unwrap_or(false)
    }

    pub fn min_tier(&self) -> Tier {
        self.requirements.min_tier.unwrap_or(Tier::Bronze)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PricingKind {
    #[default]
    Fixed,
    Hourly,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(rename = "type", default)]
    pub kind: PricingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Pending,
    Viewed,
    Accepted,
    Rejected,
    Withdrawn,
}

impl QuoteStatus {
    pub const fn label(self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Viewed => "viewed",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn can_transition_to(self, next: QuoteStatus) -> bool {
        match self {
            QuoteStatus::Pending => matches!(next, QuoteStatus::Viewed | QuoteStatus::Withdrawn),
            QuoteStatus::Viewed => matches!(
                next,
                QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Withdrawn
            ),
            QuoteStatus::Accepted | QuoteStatus::Rejected | QuoteStatus::Withdrawn => false,
        }
    }
}

/// Provider-provided content for a new quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub pricing: Pricing,
}

/// A provider's priced proposal. `match_score` is advisory and may be recomputed at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub request_id: QuoteRequestId,
    pub provider_id: UserId,
    pub title: String,
    pub description: String,
    pub pricing: Pricing,
    pub status: QuoteStatus,
    pub match_score: u8,
    pub submitted_at: DateTime<Utc>,
}
