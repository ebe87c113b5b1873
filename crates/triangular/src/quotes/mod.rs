//! Quote requests, provider quotes, and the 100-point match scorer that ranks them.

pub mod domain;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Budget, ExperienceLevel, Pricing, PricingKind, Quote, QuoteDraft, QuoteRequest,
    QuoteRequestDraft, QuoteRequestStatus, QuoteRequirements, QuoteStatus,
};
pub use repository::QuoteRepository;
pub use router::quote_router;
pub use scoring::{match_breakdown, match_score, MatchBreakdown, ScoringError};
pub use service::{QuoteService, QuoteServiceError, QuoteValidation};
