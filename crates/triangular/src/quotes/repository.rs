use super::domain::{Quote, QuoteRequest, QuoteStatus};
use crate::identity::{QuoteId, QuoteRequestId};
use crate::store::RepositoryError;

/// Storage abstraction for quote requests and the quotes submitted against them.
pub trait QuoteRepository: Send + Sync {
    fn insert_request(&self, request: QuoteRequest) -> Result<QuoteRequest, RepositoryError>;
    fn fetch_request(&self, id: &QuoteRequestId) -> Result<Option<QuoteRequest>, RepositoryError>;
    /// Store a quote and bump the parent's `quotes_received` in the same write. A second quote
    /// from the same provider for the same request is refused with `Conflict`; a missing parent
    /// with `NotFound`.
    fn insert_quote(&self, quote: Quote) -> Result<Quote, RepositoryError>;
    fn fetch_quote(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError>;
    /// Move a quote from `expected` to `next`, failing with `StaleStatus` when another writer
    /// moved it first.
    fn transition_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<Quote, RepositoryError>;
    /// Accept the quote and award its request in one write. `StaleStatus` when the quote left
    /// `expected` or the request can no longer be awarded; nothing is written in either case.
    fn award_quote(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
    ) -> Result<(Quote, QuoteRequest), RepositoryError>;
    /// Overwrite the advisory score and nothing else.
    fn write_match_score(&self, id: &QuoteId, score: u8) -> Result<(), RepositoryError>;
    /// Quotes for one request in submission order.
    fn quotes_for(&self, request_id: &QuoteRequestId) -> Result<Vec<Quote>, RepositoryError>;
}
