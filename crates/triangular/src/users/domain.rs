use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::tiers::Tier;

/// Role taxonomy a user registers under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Student,
    Contributor,
    Business,
    Recruiter,
    Admin,
    SuperAdmin,
}

impl UserType {
    pub const fn label(self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::Contributor => "contributor",
            UserType::Business => "business",
            UserType::Recruiter => "recruiter",
            UserType::Admin => "admin",
            UserType::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(UserType::Student),
            "contributor" => Some(UserType::Contributor),
            "business" => Some(UserType::Business),
            "recruiter" => Some(UserType::Recruiter),
            "admin" => Some(UserType::Admin),
            "super_admin" => Some(UserType::SuperAdmin),
            _ => None,
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, UserType::Admin | UserType::SuperAdmin)
    }
}

/// Sub-platforms a user may access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platforms {
    pub huse_circle: bool,
    pub dofracto: bool,
    pub quotify: bool,
}

impl Default for Platforms {
    fn default() -> Self {
        Self {
            huse_circle: true,
            dofracto: false,
            quotify: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Monthly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Subscription {
    pub active: bool,
    pub plan: SubscriptionPlan,
}

/// Provider attributes consumed by the quote match scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderProfile {
    pub services: Vec<String>,
    pub rating: f64,
    pub total_reviews: u32,
    pub completed_projects: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuotifyProfile {
    pub is_provider: bool,
    pub provider: ProviderProfile,
}

/// Aggregate root. `reputation` and `tier` are only ever written through the reputation ledger;
/// `version` increments on every committed ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub user_type: UserType,
    pub platforms: Platforms,
    pub tier: Tier,
    pub reputation: u64,
    pub version: u64,
    pub subscription: Subscription,
    pub quotify: QuotifyProfile,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Freshly registered user: bronze, zero reputation.
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, user_type: UserType) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into().trim().to_ascii_lowercase(),
            user_type,
            platforms: Platforms::default(),
            tier: Tier::Bronze,
            reputation: 0,
            version: 0,
            subscription: Subscription::default(),
            quotify: QuotifyProfile::default(),
            is_banned: false,
            created_at: Utc::now(),
        }
    }

    pub fn can_graduate(&self) -> bool {
        crate::tiers::can_graduate(self.reputation, self.subscription.active)
    }
}
