use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use triangular::config::{LedgerConfig, StorageConfig};
use triangular::error::AppError;
use triangular::events::EventPublisher;
use triangular::opportunities::ApplicationService;
use triangular::quotes::QuoteService;
use triangular::reputation::ReputationLedger;
use triangular::store::InMemoryStore;
use triangular::tiers::Tier;
use triangular::users::{User, UserRepository};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The three services wired against one shared store.
pub(crate) struct Services<E> {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) ledger: Arc<ReputationLedger<InMemoryStore, E>>,
    pub(crate) applications: Arc<ApplicationService<InMemoryStore, E>>,
    pub(crate) quotes: Arc<QuoteService<InMemoryStore>>,
}

pub(crate) fn build_services<E>(
    events: Arc<E>,
    ledger: LedgerConfig,
    storage: StorageConfig,
) -> Services<E>
where
    E: EventPublisher + 'static,
{
    let store = Arc::new(InMemoryStore::new());
    Services {
        ledger: Arc::new(ReputationLedger::new(
            Arc::clone(&store),
            Arc::clone(&events),
            ledger,
            storage.clone(),
        )),
        applications: Arc::new(ApplicationService::new(
            Arc::clone(&store),
            events,
            storage.clone(),
        )),
        quotes: Arc::new(QuoteService::new(Arc::clone(&store), storage)),
        store,
    }
}

/// Load a JSON array of users into the store. Returns how many were inserted.
pub(crate) async fn seed_users<E>(services: &Services<E>, path: &Path) -> Result<usize, AppError>
where
    E: EventPublisher + 'static,
{
    let raw = std::fs::read_to_string(path)?;
    load_directory(services, &raw).await
}

/// Users enter as fresh bronze accounts at version zero. A nonzero `reputation` in the input
/// becomes an opening ledger entry, so the tier is derived from the schedule and the ledger sum
/// matches the stored total from the start.
pub(crate) async fn load_directory<E>(services: &Services<E>, raw: &str) -> Result<usize, AppError>
where
    E: EventPublisher + 'static,
{
    let users: Vec<User> = serde_json::from_str(raw)?;
    let count = users.len();
    for mut user in users {
        let opening = i64::try_from(user.reputation)
            .map_err(|_| invalid_seed(format!("reputation of {} is out of range", user.id)))?;
        if opening > 0 && user.is_banned {
            return Err(invalid_seed(format!(
                "banned user {} cannot carry an opening balance",
                user.id
            )));
        }

        user.reputation = 0;
        user.version = 0;
        user.tier = Tier::Bronze;
        let stored = services
            .store
            .insert_user(user)
            .map_err(|err| invalid_seed(format!("seed user rejected: {err}")))?;

        if opening > 0 {
            let entry = services
                .ledger
                .append(&stored.id, opening, OPENING_BALANCE_REASON)
                .await?;
            debug!(user_id = %stored.id, balance = entry.balance_after, "opening balance recorded");
        }
    }
    Ok(count)
}

const OPENING_BALANCE_REASON: &str = "opening balance";

fn invalid_seed(message: String) -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, message))
}

pub(crate) fn parse_tier(raw: &str) -> Result<Tier, String> {
    Tier::parse(raw).ok_or_else(|| {
        format!(
            "unknown tier '{raw}' (expected bronze, silver, gold, platinum, contributor or business_owner)"
        )
    })
}
