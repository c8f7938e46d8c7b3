use std::{io::ErrorKind, net::SocketAddr, time::Duration};

use anyhow::{Context, Result, anyhow};
use line_chat_relay::server::{Server, ServerConfig};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
    time::{sleep, timeout},
};

const READ_TIMEOUT: Duration = Duration::from_secs(2);
const WELCOME: [&str; 2] = [
    "Welcome to the IRC server!\n",
    "Please register your nickname with NICK <your_nickname>\n",
];

struct Relay {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl Relay {
    async fn start() -> Result<Self> {
        Self::start_with(ServerConfig::default()).await
    }

    async fn start_with(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let server = Server::new(listener, config);
        let addr = server.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .run_until(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(Self {
            addr,
            shutdown_tx,
            task,
        })
    }

    async fn stop(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        timeout(Duration::from_secs(10), self.task).await???;
        Ok(())
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        for line in WELCOME {
            client.expect(line).await?;
        }
        Ok(client)
    }

    async fn register(addr: SocketAddr, nickname: &str) -> Result<Self> {
        let mut client = Self::connect(addr).await?;
        client.send(&format!("NICK {nickname}\n")).await?;
        client
            .expect(&format!("Nickname registered: {nickname}\n"))
            .await?;
        Ok(client)
    }

    async fn send(&mut self, raw: &str) -> Result<()> {
        self.writer.write_all(raw.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let bytes = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .context("timed out waiting for a line")??;
        if bytes == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    async fn expect(&mut self, expected: &str) -> Result<()> {
        match self.next_line().await? {
            Some(line) if line == expected => Ok(()),
            Some(line) => Err(anyhow!("expected {expected:?}, got {line:?}")),
            None => Err(anyhow!("expected {expected:?}, connection closed")),
        }
    }

    async fn expect_closed(&mut self) -> Result<()> {
        let mut line = String::new();
        let read = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .context("timed out waiting for the connection to close")?;
        match read {
            Ok(0) => Ok(()),
            // A close with unread input on the server side surfaces as a reset.
            Err(err) if err.kind() == ErrorKind::ConnectionReset => Ok(()),
            Ok(_) => Err(anyhow!("expected connection close, got {line:?}")),
            Err(err) => Err(err.into()),
        }
    }
}

/// Polls NAMES until the channel shows `expected`, since disconnect cleanup
/// runs on the departing session's own task.
async fn wait_for_names(client: &mut Client, channel: &str, expected: &str) -> Result<()> {
    let wanted = format!("Users in {channel}: {expected}\n");
    for _ in 0..50 {
        client.send(&format!("NAMES {channel}\n")).await?;
        let line = client.next_line().await?.context("connection closed")?;
        if line == wanted {
            return Ok(());
        }
        sleep(Duration::from_millis(20)).await;
    }
    Err(anyhow!("channel {channel} never showed {expected:?}"))
}

#[tokio::test]
async fn members_exchange_messages_in_a_channel() -> Result<()> {
    let relay = Relay::start().await?;

    let mut alice = Client::register(relay.addr, "alice").await?;
    alice.send("JOIN #t\n").await?;
    alice.expect("Joined channel #t\n").await?;

    let mut bob = Client::register(relay.addr, "bob").await?;
    bob.send("JOIN #t\n").await?;
    bob.expect("Joined channel #t\n").await?;
    alice.expect("bob joined channel #t\n").await?;

    bob.send("PRIVMSG #t hello\n").await?;
    alice.expect("bob in #t: hello\n").await?;

    // Bob's next line is the LIST reply, not an echo of his own message.
    bob.send("LIST\n").await?;
    bob.expect("Channel: #t Users: 2\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn list_reports_channels() -> Result<()> {
    let relay = Relay::start().await?;
    let mut alice = Client::register(relay.addr, "alice").await?;

    alice.send("LIST\n").await?;
    alice.expect("No active channels.\n").await?;

    alice.send("JOIN #t\n").await?;
    alice.expect("Joined channel #t\n").await?;
    alice.send("LIST\n").await?;
    alice.expect("Channel: #t Users: 1\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn shutdown_notifies_every_session_before_closing() -> Result<()> {
    let relay = Relay::start().await?;

    let mut alice = Client::register(relay.addr, "alice").await?;
    let mut bob = Client::register(relay.addr, "bob").await?;
    for client in [&mut alice, &mut bob] {
        client.send("JOIN #t\n").await?;
        client.expect("Joined channel #t\n").await?;
    }
    alice.expect("bob joined channel #t\n").await?;

    relay.stop().await?;

    for client in [&mut alice, &mut bob] {
        client
            .expect("server is shutting down. You've been disconnected.\n")
            .await?;
        client.expect_closed().await?;
    }
    Ok(())
}

#[tokio::test]
async fn unregistered_commands_are_prompted() -> Result<()> {
    let relay = Relay::start().await?;
    let mut client = Client::connect(relay.addr).await?;

    client.send("JOIN #t\nLIST\n").await?;
    client
        .expect("Please set a nickname using NICK <your_nickname>.\n")
        .await?;
    client
        .expect("Please set a nickname using NICK <your_nickname>.\n")
        .await?;

    client.send("NICK carol\nLIST\n").await?;
    client.expect("Nickname registered: carol\n").await?;
    client.expect("No active channels.\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn nicknames_are_unique_until_released() -> Result<()> {
    let relay = Relay::start().await?;
    let mut alice = Client::register(relay.addr, "alice").await?;

    let mut other = Client::connect(relay.addr).await?;
    other.send("NICK alice\n").await?;
    other.expect("Nickname already taken, try another one.\n").await?;
    other.send("JOIN #t\n").await?;
    other
        .expect("Please set a nickname using NICK <your_nickname>.\n")
        .await?;

    alice.send("QUIT\n").await?;
    alice.expect_closed().await?;

    other.send("NICK alice\n").await?;
    other.expect("Nickname registered: alice\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn lines_are_reassembled_across_reads() -> Result<()> {
    let relay = Relay::start().await?;
    let mut client = Client::connect(relay.addr).await?;

    client.send("NI").await?;
    sleep(Duration::from_millis(50)).await;
    client.send("CK dave\r\n\nJOIN #split\nPRIV").await?;
    client.expect("Nickname registered: dave\n").await?;
    client.expect("Joined channel #split\n").await?;

    client.send("MSG #split\n").await?;
    client
        .expect("Usage: PRIVMSG <channel> <message>\n")
        .await?;

    relay.stop().await
}

#[tokio::test]
async fn part_without_membership_still_confirms() -> Result<()> {
    let relay = Relay::start().await?;
    let mut alice = Client::register(relay.addr, "alice").await?;

    alice.send("PART #ghost\n").await?;
    alice.expect("Left channel #ghost\n").await?;
    alice.send("LIST\n").await?;
    alice.expect("No active channels.\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn non_member_cannot_message_a_channel() -> Result<()> {
    let relay = Relay::start().await?;
    let mut alice = Client::register(relay.addr, "alice").await?;
    let mut mallory = Client::register(relay.addr, "mallory").await?;

    alice.send("JOIN #t\n").await?;
    alice.expect("Joined channel #t\n").await?;

    mallory.send("PRIVMSG #t psst\n").await?;
    mallory
        .expect("You are not in channel #t. Please JOIN first.\n")
        .await?;

    // Nothing reached alice: her next line answers her own command.
    alice.send("NAMES #t\n").await?;
    alice.expect("Users in #t: alice\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn disconnect_removes_membership_everywhere() -> Result<()> {
    let relay = Relay::start().await?;
    let mut alice = Client::register(relay.addr, "alice").await?;
    let mut bob = Client::register(relay.addr, "bob").await?;

    alice.send("JOIN #a\nJOIN #b\n").await?;
    alice.expect("Joined channel #a\n").await?;
    alice.expect("Joined channel #b\n").await?;
    bob.send("JOIN #b\n").await?;
    bob.expect("Joined channel #b\n").await?;
    alice.expect("bob joined channel #b\n").await?;

    drop(alice);

    wait_for_names(&mut bob, "#b", "bob").await?;
    bob.send("NAMES\n").await?;
    bob.expect("Nicknames in all channels:\n").await?;
    bob.expect("#a: \n").await?;
    bob.expect("#b: bob\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn quit_stops_processing_the_rest_of_the_batch() -> Result<()> {
    let relay = Relay::start().await?;
    let mut client = Client::register(relay.addr, "erin").await?;

    client.send("QUIT\nJOIN #late\n").await?;
    client.expect_closed().await?;

    let mut observer = Client::register(relay.addr, "frank").await?;
    observer.send("LIST\n").await?;
    observer.expect("No active channels.\n").await?;

    relay.stop().await
}

#[tokio::test]
async fn idle_sessions_time_out() -> Result<()> {
    let relay = Relay::start_with(ServerConfig {
        read_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await?;

    let mut idle = Client::register(relay.addr, "sleepy").await?;
    idle.expect_closed().await?;

    // The nickname is released along with the session.
    let _again = Client::register(relay.addr, "sleepy").await?;

    relay.stop().await
}
