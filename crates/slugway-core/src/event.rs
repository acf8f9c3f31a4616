use crate::correlation::CorrelationId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const REDIRECTS_COMPONENT: &str = "redirects";
pub const SLUG_CHANGED_EVENT: &str = "slugChanged";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugChangeCorrelations {
    pub correlation_id_slug_update: CorrelationId,
    pub correlation_id_redirect_creation: CorrelationId,
}

/// Broadcast after a slug change was processed, so listeners such as an open
/// editor session can refresh their slug and redirect listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugChangedEvent {
    pub component_name: String,
    pub event_name: String,
    pub correlations: SlugChangeCorrelations,
    pub auto_update_slugs: bool,
    pub auto_create_redirects: bool,
}

impl SlugChangedEvent {
    pub fn new(
        correlations: SlugChangeCorrelations,
        auto_update_slugs: bool,
        auto_create_redirects: bool,
    ) -> Self {
        Self {
            component_name: REDIRECTS_COMPONENT.to_string(),
            event_name: SLUG_CHANGED_EVENT.to_string(),
            correlations,
            auto_update_slugs,
            auto_create_redirects,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EventSinkError {
    #[error("failed to publish event: {0}")]
    Publish(String),
    #[error("event serialization failed: {0}")]
    Serialization(String),
}

/// Receives notifications emitted by the cascade.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn publish(&self, event: &SlugChangedEvent) -> Result<(), EventSinkError>;
}
