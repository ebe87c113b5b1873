//! Domain events relayed to the notification layer. Delivery is best effort: a failed publish is
//! logged and never fails the operation that produced the event.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, warn};

use crate::identity::{ApplicationId, OpportunityId, UserId};
use crate::opportunities::ApplicationStatus;
use crate::tiers::Tier;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    ReputationChanged {
        user_id: UserId,
        amount: i64,
        reason: String,
        balance_after: u64,
    },
    TierChanged {
        user_id: UserId,
        from: Tier,
        to: Tier,
    },
    ApplicationStatusChanged {
        application_id: ApplicationId,
        opportunity_id: OpportunityId,
        from: Option<ApplicationStatus>,
        to: ApplicationStatus,
    },
}

impl DomainEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            DomainEvent::ReputationChanged { .. } => "reputation.changed",
            DomainEvent::TierChanged { .. } => "tier.changed",
            DomainEvent::ApplicationStatusChanged { .. } => "application.status_changed",
        }
    }
}

/// Outbound hook for the real-time/notification layer.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent) -> Result<(), EventError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

pub(crate) fn publish_best_effort<E>(publisher: &E, event: DomainEvent)
where
    E: EventPublisher + ?Sized,
{
    let name = event.name();
    match publisher.publish(event) {
        Ok(()) => debug!(event = name, "domain event published"),
        Err(err) => warn!(event = name, error = %err, "domain event dropped"),
    }
}

/// Publisher that only writes events to the trace log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: DomainEvent) -> Result<(), EventError> {
        let payload = serde_json::to_string(&event)
            .map_err(|err| EventError::Transport(err.to_string()))?;
        tracing::info!(event = event.name(), %payload, "domain event");
        Ok(())
    }
}

/// Publisher that keeps every event in memory, for demos and assertions.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<DomainEvent>>,
}

impl InMemoryEventLog {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, event: DomainEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::Transport("event log mutex poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}
