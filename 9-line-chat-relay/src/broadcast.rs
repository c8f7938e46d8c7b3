//! Fan-out delivery with per-recipient failure isolation.

use std::{collections::HashSet, sync::Arc};

use tracing::{debug, warn};

use crate::{
    registry::SessionRegistry,
    session::{Outbound, SessionId},
};

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Queues `message` for every recipient, at most once each.
    ///
    /// A recipient that has disconnected is logged and skipped; it never stops
    /// delivery to the others and is not reported to the caller. Returns how
    /// many recipients accepted the message.
    pub async fn broadcast(&self, recipients: &[SessionId], message: &str) -> usize {
        let mut seen = HashSet::with_capacity(recipients.len());
        let unique: Vec<SessionId> = recipients
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let mut delivered = 0;
        for (id, outbox) in self.registry.outboxes(&unique).await {
            let Some(outbox) = outbox else {
                debug!(session = %id, "recipient already gone, skipping");
                continue;
            };
            match outbox.send(Outbound::Line(message.to_string())) {
                Ok(()) => delivered += 1,
                Err(_) => warn!(session = %id, "failed to deliver message, recipient closed"),
            }
        }
        delivered
    }
}
