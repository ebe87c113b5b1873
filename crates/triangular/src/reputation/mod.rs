//! Append-only reputation ledger and the standing views derived from it.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{LedgerCommit, LedgerEntry, ReconcileReport, ReputationStanding};
pub use repository::LedgerRepository;
pub use router::reputation_router;
pub use service::{LedgerError, LedgerValidation, ReputationLedger};
