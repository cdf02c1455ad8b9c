//! Bridges bus events to listener connections.

use std::sync::Arc;

use super::bus::{EventBus, EventHandler, HandlerError, SubscriptionId};
use super::{PlaybackEvent, Topic};
use crate::api::hub::Hub;
use crate::api::protocol::encode_event;

/// Bus subscriber that encodes each event once and broadcasts it to the hub.
///
/// Subscribed to [`Topic::Any`], so its worker task is the single dispatch
/// path to listeners and preserves publish order across topics.
pub struct HubBridge {
    hub: Arc<Hub>,
}

impl HubBridge {
    /// Name the bridge subscribes under.
    pub const SUBSCRIBER_NAME: &'static str = "hub";

    #[must_use]
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Subscribes a bridge for `hub` on `bus`.
    pub fn attach(bus: &EventBus, hub: Arc<Hub>) -> SubscriptionId {
        bus.subscribe(Topic::Any, Self::SUBSCRIBER_NAME, Self::new(hub))
    }
}

impl EventHandler for HubBridge {
    fn handle(&self, event: &PlaybackEvent) -> Result<(), HandlerError> {
        let frame = encode_event(event)
            .map_err(|e| HandlerError::new(format!("failed to encode {:?}: {e}", event.topic())))?;

        let stats = self.hub.broadcast(frame);
        log::debug!(
            "[Hub] {:?} delivered to {} listener(s), {} evicted",
            event.topic(),
            stats.delivered,
            stats.evicted
        );
        Ok(())
    }
}
