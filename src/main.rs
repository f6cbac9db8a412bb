use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use chatlink::logging::{self, LogConfig, LogFormat};
use chatlink::theme as t;
use chatlink::{AuthPlacement, ChatClient, ClientConfig, SessionEvent};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AuthArg {
    Query,
    Header,
}

impl From<AuthArg> for AuthPlacement {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Query => AuthPlacement::Query,
            AuthArg::Header => AuthPlacement::Header,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "chatlink",
    version,
    about = "Chat with a streaming assistant over WebSocket"
)]
struct Cli {
    /// Config file [default: ~/.chatlink/config.toml]
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Server address, e.g. ws://127.0.0.1:8000
    #[arg(long, value_name = "URL")]
    url: Option<String>,
    /// Access token
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,
    /// How the token is sent
    #[arg(long, value_enum)]
    auth: Option<AuthArg>,
    /// Conversation to post messages to
    #[arg(long, short = 'c', value_name = "ID")]
    conversation: String,
    /// Log output format (pretty, compact, json)
    #[arg(long, value_name = "FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("unknown log format `{s}`"))
}

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Connect,
    Disconnect,
    Status,
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match trimmed {
            "/quit" | "/exit" => Self::Quit,
            "/connect" => Self::Connect,
            "/disconnect" => Self::Disconnect,
            "/status" => Self::Status,
            cmd if cmd.starts_with('/') => Self::Unknown(cmd),
            _ => Self::Message(line.trim_end_matches(['\r', '\n'])),
        }
    }
}

fn render(event: SessionEvent) {
    match event {
        SessionEvent::Token(fragment) => {
            print!("{fragment}");
            let _ = std::io::stdout().flush();
        }
        SessionEvent::TurnComplete(turn) => {
            println!();
            println!("{}", t::muted(&format!("[{}]", turn.message_id)));
        }
        SessionEvent::Error(err) => {
            eprintln!("{}", t::icon_fail(&err.to_string()));
        }
        SessionEvent::Disconnected(info) => {
            if info.turn_interrupted {
                println!();
                eprintln!("{}", t::icon_warn("reply interrupted"));
            }
            if let Some(reason) = info.reason {
                eprintln!("{}", t::icon_warn(&format!("connection lost: {reason}")));
            }
        }
        SessionEvent::StateChanged(state) => {
            eprintln!("{}", t::muted(&format!("· {}", t::state_label(state))));
        }
        SessionEvent::Connected => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    t::init_color(cli.no_color);

    let mut log_config = LogConfig::from_env();
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    logging::init(log_config);

    let mut config = ClientConfig::load(cli.config.clone())?;
    config.apply_env();
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    if let Some(auth) = cli.auth {
        config.auth = auth.into();
    }
    let endpoint = config.endpoint()?;

    eprintln!("{}", t::bold("chatlink"));
    eprintln!("{}", t::label_value("Server", &endpoint.to_string()));
    eprintln!("{}", t::label_value("Conversation", &cli.conversation));
    eprintln!(
        "{}",
        t::muted("  /quit, /connect, /disconnect, /status")
    );

    let (client, mut events) = ChatClient::with_events(endpoint, config.session_config());
    client.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Input::Empty => {}
                    Input::Quit => break,
                    Input::Connect => client.connect()?,
                    Input::Disconnect => client.disconnect()?,
                    Input::Status => {
                        let state = client.state().await?;
                        eprintln!("{}", t::label_value("State", &t::state_label(state)));
                    }
                    Input::Unknown(cmd) => {
                        eprintln!("{}", t::icon_warn(&format!("unknown command {cmd}")));
                    }
                    Input::Message(text) => {
                        if let Err(err) = client.send(cli.conversation.clone(), text).await {
                            eprintln!("{}", t::icon_fail(&err.to_string()));
                        }
                    }
                }
            }
            Some(event) = events.recv() => render(event),
        }
    }

    client.shutdown().await;
    eprintln!("{}", t::icon_ok("bye"));
    Ok(())
}
