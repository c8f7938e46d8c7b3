//! Stop-the-world shutdown of every active session.

use tracing::{info, warn};

use crate::{
    registry::SessionRegistry,
    reply::SHUTDOWN_NOTICE,
    session::Outbound,
};

/// Queues the shutdown notice followed by a close marker for every session
/// registered right now.
///
/// The registry is snapshotted under its lock first, so workers that finish
/// or start concurrently can't disturb the iteration. Because each outbox is
/// FIFO, a session's worker writes the notice before it disconnects. Returns
/// how many sessions were still reachable.
pub async fn disconnect_all(registry: &SessionRegistry) -> usize {
    let sessions = registry.snapshot().await;
    info!(sessions = sessions.len(), "notifying sessions of shutdown");

    let mut notified = 0;
    for (id, outbox) in sessions {
        if outbox.send(Outbound::Line(SHUTDOWN_NOTICE.to_string())).is_err() {
            warn!(session = %id, "failed to send shutdown notice, session already closing");
            continue;
        }
        // Can only fail if the worker exited between the two sends.
        let _ = outbox.send(Outbound::Close);
        notified += 1;
    }
    notified
}
