use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::event::OrderCreated;

/// Errors from dispatching an event to the outside world.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event payload could not be serialized.
    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The downstream collaborator rejected or never received the event.
    #[error("Publisher unavailable: {0}")]
    Unavailable(String),
}

/// Trait for order-created notification dispatch.
///
/// Must only be called after the placement transaction has committed;
/// implementations are never part of the transaction's critical section.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Emits one `order.created` notification.
    async fn publish(&self, event: OrderCreated) -> Result<(), PublishError>;
}

#[derive(Debug, Default)]
struct InMemoryPublisherState {
    published: Vec<OrderCreated>,
    fail_on_publish: bool,
}

/// In-memory publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    state: Arc<RwLock<InMemoryPublisherState>>,
}

impl InMemoryEventPublisher {
    /// Creates a new in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the publisher to fail on subsequent publish calls.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().unwrap().fail_on_publish = fail;
    }

    /// Returns the events published so far.
    pub fn published(&self) -> Vec<OrderCreated> {
        self.state.read().unwrap().published.clone()
    }

    /// Returns the number of events published so far.
    pub fn published_count(&self) -> usize {
        self.state.read().unwrap().published.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: OrderCreated) -> Result<(), PublishError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_publish {
            return Err(PublishError::Unavailable(
                "publisher configured to fail".to_string(),
            ));
        }
        state.published.push(event);
        Ok(())
    }
}

/// Publisher that logs events instead of handing them to a broker.
///
/// The default wiring when no external notification collaborator is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher;

impl LoggingEventPublisher {
    /// Creates a new logging publisher.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: OrderCreated) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(
            event_type = OrderCreated::EVENT_TYPE,
            %payload,
            "event published"
        );
        Ok(())
    }
}
