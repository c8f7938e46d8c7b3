//! Per-connection worker: reads lines, dispatches them and writes whatever
//! the session's outbox holds.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    select,
    time::{self, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    dispatch::Flow,
    error::ConnectionError,
    framing::{LineBuffer, READ_CHUNK},
    reply,
    server::ServerState,
    session::{Outbound, Outbox, OutboxReceiver, Session, SessionId},
};

/// Why a session's loop ended without a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    PeerClosed,
    TimedOut,
    ServerShutdown,
}

/// Runs one session to completion and always cleans up after it.
///
/// The directory entry and the registry entry are removed before the socket
/// is dropped, so a peer that sees EOF can rely on its nickname being free.
pub(crate) async fn run_session(
    stream: TcpStream,
    peer: SocketAddr,
    id: SessionId,
    outbox: Outbox,
    mut inbox: OutboxReceiver,
    state: Arc<ServerState>,
) {
    let (mut reader, mut writer) = stream.into_split();
    let mut session = Session::new(id, outbox);
    session.reply(reply::WELCOME);

    match drive_session(&mut session, &mut reader, &mut writer, &mut inbox, &state).await {
        Ok(end) => info!(%peer, session = %id, ?end, "session ended"),
        Err(err) => warn!(%peer, session = %id, error = %err, "session ended with error"),
    }
    session.terminate();

    let nickname = state.directory.remove_session(id).await;
    state.registry.remove(id).await;
    debug!(session = %id, ?nickname, "session state released");

    if let Err(err) = writer.shutdown().await {
        debug!(session = %id, ?err, "failed to shut down writer cleanly");
    }
}

async fn drive_session<R, W>(
    session: &mut Session,
    reader: &mut R,
    writer: &mut W,
    inbox: &mut OutboxReceiver,
    state: &ServerState,
) -> Result<SessionEnd, ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let read_timeout = state.config.read_timeout;
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK];
    let idle = time::sleep(read_timeout);
    tokio::pin!(idle);

    loop {
        select! {
            // Queued output goes out before more input is read.
            biased;

            outbound = inbox.recv() => match outbound {
                Some(Outbound::Line(text)) => write_line(writer, &text).await?,
                Some(Outbound::Close) | None => {
                    flush_pending(inbox, writer).await?;
                    return Ok(SessionEnd::ServerShutdown);
                }
            },
            read = reader.read(&mut chunk) => {
                let count = read?;
                if count == 0 {
                    return Ok(SessionEnd::PeerClosed);
                }
                idle.as_mut().reset(Instant::now() + read_timeout);

                for line in buffer.push(&chunk[..count])? {
                    if state.dispatcher.dispatch(session, &line).await == Flow::Quit {
                        flush_pending(inbox, writer).await?;
                        return Ok(SessionEnd::Quit);
                    }
                }
            }
            () = &mut idle => return Ok(SessionEnd::TimedOut),
        }
    }
}

/// Writes everything already queued, stopping at a close marker.
async fn flush_pending<W>(
    inbox: &mut OutboxReceiver,
    writer: &mut W,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(Outbound::Line(text)) = inbox.try_recv() {
        write_line(writer, &text).await?;
    }
    Ok(())
}

async fn write_line<W>(writer: &mut W, text: &str) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
