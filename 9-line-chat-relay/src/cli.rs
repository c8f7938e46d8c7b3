use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::server::{DEFAULT_SHUTDOWN_GRACE, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay, accepting TCP connections.
    Serve(ServeArgs),
    /// Connect to a relay from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host address to bind to.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(short, long, default_value_t = 6668)]
    pub port: u16,

    /// Disconnect a client after this many seconds without input.
    #[arg(long, default_value_t = 1000)]
    pub read_timeout_secs: u64,
}

impl ServeArgs {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the relay to connect to.
    #[arg(long, default_value = "127.0.0.1:6668")]
    pub server: String,

    /// Nickname to register right after connecting.
    #[arg(long)]
    pub nickname: Option<String>,

    /// Channel to join right after connecting.
    #[arg(long)]
    pub channel: Option<String>,
}
