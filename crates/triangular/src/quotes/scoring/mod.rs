//! Fixed 100-point rubric ranking a provider against a quote request.
//!
//! | Component   | Points | Rule                                                   |
//! |-------------|--------|--------------------------------------------------------|
//! | skills      | 40     | share of required skills found inside provider services |
//! | tier        | 20     | all or nothing, via the access-control order            |
//! | rating      | 20     | linear over 0..=5                                       |
//! | volume      | 10     | completed projects, saturating at 10                    |
//! | reputation  | 10     | saturating at 100 000                                   |
//!
//! Components are clamped individually and only the sum is rounded.

mod rules;

use serde::Serialize;

use super::domain::QuoteRequest;
use crate::users::User;

pub const SKILL_POINTS: f64 = 40.0;
pub const TIER_POINTS: f64 = 20.0;
pub const RATING_POINTS: f64 = 20.0;
pub const VOLUME_POINTS: f64 = 10.0;
pub const REPUTATION_POINTS: f64 = 10.0;

pub const MAX_RATING: f64 = 5.0;
pub const VOLUME_SATURATION: u32 = 10;
pub const REPUTATION_SATURATION: u64 = 100_000;

/// Unrounded contributions behind a match score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBreakdown {
    pub skills: f64,
    pub tier: f64,
    pub rating: f64,
    pub volume: f64,
    pub reputation: f64,
    pub matched_skills: usize,
    pub required_skills: usize,
}

impl MatchBreakdown {
    pub fn raw_total(&self) -> f64 {
        self.skills + self.tier + self.rating + self.volume + self.reputation
    }

    pub fn total(&self) -> u8 {
        self.raw_total().round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("required skill at position {index} is blank")]
    BlankSkill { index: usize },
    #[error("provider rating {0} is outside 0..=5")]
    RatingOutOfRange(f64),
}

pub fn match_breakdown(
    request: &QuoteRequest,
    provider: &User,
) -> Result<MatchBreakdown, ScoringError> {
    let profile = &provider.quotify.provider;
    let rating = profile.rating;
    if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
        return Err(ScoringError::RatingOutOfRange(rating));
    }

    let (matched_skills, required_skills) =
        rules::skill_overlap(&request.requirements.skills, &profile.services)?;

    Ok(MatchBreakdown {
        skills: rules::skill_points(matched_skills, required_skills),
        tier: rules::tier_points(provider.tier, request.min_tier()),
        rating: rules::rating_points(rating),
        volume: rules::volume_points(profile.completed_projects),
        reputation: rules::reputation_points(provider.reputation),
        matched_skills,
        required_skills,
    })
}

/// Integer score in 0..=100. Deterministic for identical inputs.
pub fn match_score(request: &QuoteRequest, provider: &User) -> Result<u8, ScoringError> {
    match_breakdown(request, provider).map(|breakdown| breakdown.total())
}
