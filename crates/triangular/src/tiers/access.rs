use super::Tier;

/// Access-control ordering used by eligibility gates and quote requirements.
pub const ACCESS_ORDER: [Tier; 6] = [
    Tier::Bronze,
    Tier::Silver,
    Tier::Gold,
    Tier::Platinum,
    Tier::Contributor,
    Tier::BusinessOwner,
];

pub fn access_rank(tier: Tier) -> usize {
    ACCESS_ORDER
        .iter()
        .position(|candidate| *candidate == tier)
        .unwrap_or(0)
}

/// True when `held` sits at or above `required` in [`ACCESS_ORDER`].
pub fn meets_minimum(held: Tier, required: Tier) -> bool {
    access_rank(held) >= access_rank(required)
}
