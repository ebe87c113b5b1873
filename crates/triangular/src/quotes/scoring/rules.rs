use std::collections::BTreeSet;

use super::{
    ScoringError, MAX_RATING, RATING_POINTS, REPUTATION_POINTS, REPUTATION_SATURATION,
    SKILL_POINTS, TIER_POINTS, VOLUME_POINTS, VOLUME_SATURATION,
};
use crate::tiers::{meets_minimum, Tier};

/// Returns (matched, required). Required skills are lowercased and deduplicated but otherwise
/// kept verbatim, surrounding whitespace included; a skill matches when it appears as a substring
/// of any lowercased provider service.
pub(crate) fn skill_overlap(
    required: &[String],
    services: &[String],
) -> Result<(usize, usize), ScoringError> {
    let mut wanted = BTreeSet::new();
    for (index, skill) in required.iter().enumerate() {
        if skill.trim().is_empty() {
            return Err(ScoringError::BlankSkill { index });
        }
        wanted.insert(skill.to_lowercase());
    }

    let offered: Vec<String> = services.iter().map(|service| service.to_lowercase()).collect();
    let matched = wanted
        .iter()
        .filter(|skill| offered.iter().any(|service| service.contains(skill.as_str())))
        .count();

    Ok((matched, wanted.len()))
}

pub(crate) fn skill_points(matched: usize, required: usize) -> f64 {
    let ratio = matched as f64 / required.max(1) as f64;
    ratio.clamp(0.0, 1.0) * SKILL_POINTS
}

pub(crate) fn tier_points(held: Tier, required: Tier) -> f64 {
    if meets_minimum(held, required) {
        TIER_POINTS
    } else {
        0.0
    }
}

pub(crate) fn rating_points(rating: f64) -> f64 {
    (rating / MAX_RATING).clamp(0.0, 1.0) * RATING_POINTS
}

pub(crate) fn volume_points(completed_projects: u32) -> f64 {
    let ratio = completed_projects as f64 / VOLUME_SATURATION as f64;
    ratio.min(1.0) * VOLUME_POINTS
}

pub(crate) fn reputation_points(reputation: u64) -> f64 {
    let ratio = reputation as f64 / REPUTATION_SATURATION as f64;
    ratio.min(1.0) * REPUTATION_POINTS
}
