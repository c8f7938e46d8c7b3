use anyhow::{Context, Result};
use tokio::{
    io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
};
use tracing::{info, warn};

use crate::cli::ClientArgs;

const NO_CHANNEL_HINT: &str = "*** join a channel first with /JOIN <channel>";

/// What a line typed by the user turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Raw protocol line to send, newline included.
    Send(String),
    Quit,
    Hint(&'static str),
    Nothing,
}

/// Tracks the channel plain text is sent to.
#[derive(Debug, Default)]
pub struct ClientState {
    channel: Option<String>,
}

impl ClientState {
    pub fn new(channel: Option<String>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// `/CMD args` is sent as `CMD args`; anything else becomes a PRIVMSG to
    /// the current channel.
    pub fn translate(&mut self, input: &str) -> Input {
        let text = input.trim();
        if text.is_empty() {
            return Input::Nothing;
        }

        let Some(raw) = text.strip_prefix('/') else {
            return match &self.channel {
                Some(channel) => Input::Send(format!("PRIVMSG {channel} {text}\n")),
                None => Input::Hint(NO_CHANNEL_HINT),
            };
        };

        let mut tokens = raw.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Input::Nothing;
        };
        let argument = tokens.next();

        if verb.eq_ignore_ascii_case("quit") {
            return Input::Quit;
        }
        if verb.eq_ignore_ascii_case("join") {
            if let Some(channel) = argument {
                self.channel = Some(channel.to_string());
            }
        } else if verb.eq_ignore_ascii_case("part") && argument == self.channel.as_deref() {
            self.channel = None;
        }
        Input::Send(format!("{}\n", raw.trim()))
    }
}

pub async fn run(args: ClientArgs) -> Result<()> {
    let (mut reader, mut writer) = establish_connection(&args).await?;
    send_greeting(&mut writer, &args).await?;

    let mut state = ClientState::new(args.channel.clone());
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut input = String::new();
    let mut incoming = String::new();

    // Buffers are only cleared once a full line has been handled: a read_line
    // cancelled by the other branch leaves its partial data in place.
    loop {
        select! {
            bytes_read = reader.read_line(&mut incoming) => {
                if !handle_server_line(bytes_read, &incoming).await? {
                    break;
                }
                incoming.clear();
            }
            bytes_read = stdin.read_line(&mut input) => {
                if !handle_stdin_input(bytes_read, &input, &mut state, &mut writer).await? {
                    break;
                }
                input.clear();
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if let Err(error) = writer.shutdown().await {
        warn!(?error, "failed to shutdown client writer cleanly");
    }
    Ok(())
}

async fn establish_connection(
    args: &ClientArgs,
) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    info!("connected to {}", args.server);

    let (reader, writer) = stream.into_split();
    Ok((BufReader::new(reader), writer))
}

async fn send_greeting(writer: &mut OwnedWriteHalf, args: &ClientArgs) -> Result<()> {
    if let Some(nickname) = &args.nickname {
        send_line(writer, &format!("NICK {nickname}\n")).await?;
    }
    if let Some(channel) = &args.channel {
        send_line(writer, &format!("JOIN {channel}\n")).await?;
    }
    Ok(())
}

async fn handle_server_line(bytes_read: io::Result<usize>, line: &str) -> Result<bool> {
    if bytes_read.context("failed to read from server")? == 0 {
        write_stdout("*** server closed the connection\n").await?;
        return Ok(false);
    }
    write_stdout(line).await?;
    Ok(true)
}

async fn handle_stdin_input(
    bytes_read: io::Result<usize>,
    input: &str,
    state: &mut ClientState,
    writer: &mut OwnedWriteHalf,
) -> Result<bool> {
    if bytes_read? == 0 {
        return Ok(false);
    }

    match state.translate(input) {
        Input::Send(line) => send_line(writer, &line).await?,
        Input::Quit => {
            send_line(writer, "QUIT\n").await?;
            write_stdout("*** leaving chat\n").await?;
            return Ok(false);
        }
        Input::Hint(hint) => write_stderr(hint).await?,
        Input::Nothing => {}
    }
    Ok(true)
}

async fn send_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    writer
        .write_all(line.as_bytes())
        .await
        .context("failed to send to server")?;
    writer.flush().await?;
    Ok(())
}

async fn write_stdout(text: &str) -> io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await
}

async fn write_stderr(line: &str) -> io::Result<()> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(line.as_bytes()).await?;
    stderr.write_all(b"\n").await?;
    stderr.flush().await
}
