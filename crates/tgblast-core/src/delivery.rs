use std::sync::Arc;

use tracing::warn;

use crate::{
    compose::ComposedMessage,
    domain::Target,
    ports::{BroadcastTransport, TransportCapabilities},
};

/// Result of one delivery attempt to one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { reason: String },
}

/// Performs one delivery attempt per call through the injected transport.
///
/// Transport errors never escape: they are converted to
/// [`DeliveryOutcome::Failed`] and reported to the log sink, so one target's
/// failure can never abort delivery to its siblings.
#[derive(Clone)]
pub struct DeliveryExecutor {
    transport: Arc<dyn BroadcastTransport>,
}

impl DeliveryExecutor {
    pub fn new(transport: Arc<dyn BroadcastTransport>) -> Self {
        Self { transport }
    }

    pub fn capabilities(&self) -> TransportCapabilities {
        self.transport.capabilities()
    }

    pub async fn deliver(&self, message: &ComposedMessage, target: &Target) -> DeliveryOutcome {
        let result = match message {
            ComposedMessage::Text { body } => self.transport.send_text(target.id, body).await,
            ComposedMessage::Photo { body, data } => {
                self.transport.send_photo(target.id, body, data.clone()).await
            }
        };

        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!(target_id = target.id.0, target = %target.title, error = %e, "delivery failed");
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
