//! # mea
//!
//! Terminal client: loads settings, builds a [`ChatSession`], and renders
//! its transcript and progress events as plain text.

#![deny(unsafe_code)]

mod commands;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use mea_auth::{FileTokenStore, NewUser};
use mea_chat::ChatSession;
use mea_settings::{HttpRoute, MeaSettings, TransportKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::{Command, HELP};

/// MEA retrieval assistant client.
#[derive(Parser, Debug)]
#[command(name = "mea", about = "Chat with a MEA retrieval backend")]
struct Cli {
    /// Settings file (defaults to `~/.mea/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Backend base URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Query channel: `websocket` or `http`.
    #[arg(long)]
    transport: Option<String>,

    /// HTTP query endpoint: `retrieval` or `assistant`.
    #[arg(long)]
    route: Option<String>,

    /// Number of results requested per query.
    #[arg(long)]
    top_k: Option<usize>,

    /// Token file (defaults to `~/.mea/auth.json`).
    #[arg(long)]
    token_file: Option<String>,

    /// Log filter, e.g. `info` or `mea_transport=debug`.
    #[arg(long)]
    log_level: Option<String>,

    /// Do not connect on start-up.
    #[arg(long)]
    no_connect: bool,
}

impl Cli {
    fn settings(&self) -> Result<MeaSettings> {
        let mut settings = match &self.settings {
            Some(path) => mea_settings::load_settings_from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => mea_settings::load_settings().context("failed to load settings")?,
        };

        if let Some(url) = &self.base_url {
            settings.server.base_url.clone_from(url);
        }
        if let Some(value) = &self.transport {
            let Some(kind) = TransportKind::parse(value) else {
                bail!("unknown transport '{value}' (expected websocket or http)");
            };
            settings.server.transport = kind;
        }
        if let Some(value) = &self.route {
            let Some(route) = HttpRoute::parse(value) else {
                bail!("unknown route '{value}' (expected retrieval or assistant)");
            };
            settings.server.http_route = route;
        }
        if let Some(k) = self.top_k {
            settings.chat.top_k = k;
        }
        if let Some(path) = &self.token_file {
            settings.auth.token_file = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.settings()?;
    mea_core::logging::init_subscriber(&settings.logging.level);

    let store = Arc::new(FileTokenStore::new(settings.auth.token_path()));
    let session = ChatSession::new(settings, store).context("invalid settings")?;
    info!(session = ?session, "session ready");

    spawn_renderers(&session);

    if !args.no_connect {
        // failures are already in the transcript
        let _ = session.connect().await;
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => run(&session, command).await,
            Err(usage) => println!("{usage}"),
        }
    }

    session.shutdown().await;
    Ok(())
}

fn spawn_renderers(session: &ChatSession) {
    let mut transcript = session.transcript().subscribe();
    drop(tokio::spawn(async move {
        while let Ok(event) = transcript.recv().await {
            if let Some(line) = render::transcript_event(&event) {
                println!("{line}");
            }
        }
    }));

    let mut progress = session.progress().subscribe();
    drop(tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            if let Some(line) = render::progress_event(&event) {
                println!("{line}");
            }
        }
    }));

    let mut states = session.transport().subscribe();
    drop(tokio::spawn(async move {
        while let Some(state) = states.recv().await {
            println!("[connection] {state}");
        }
    }));
}

async fn run(session: &ChatSession, command: Command) {
    match command {
        Command::Query(text) => {
            // the reply lands in the transcript; the prompt stays usable
            drop(session.submit(&text));
        }
        Command::Connect => {
            let _ = session.connect().await;
        }
        Command::Close => session.transport().close(),
        Command::AddText { title, text } => {
            if session.ingestor().submit_text(&title, &text).await.is_ok() {
                session.start_progress();
            }
        }
        Command::AddPdf(path) => add_pdf(session, Path::new(&path)).await,
        Command::Stats => {
            let stats = session.stats().refresh().await;
            println!("{}", render::stats_line(&stats));
        }
        Command::Progress => session.start_progress(),
        Command::Train { query, feedback } => {
            match session.trainer().train(&query, feedback).await {
                Ok(message) => println!("{message}"),
                Err(e) => println!("! {}", e.user_message()),
            }
        }
        Command::Login { username, password } => {
            match session.auth().login(&username, &password).await {
                Ok(_) => println!("Logged in as {username}."),
                Err(e) => println!("! {}", e.user_message()),
            }
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let user = NewUser {
                username,
                email,
                password,
            };
            match session.auth().register(&user).await {
                Ok(record) => println!("Registered {}. Log in to continue.", record.username),
                Err(e) => println!("! {}", e.user_message()),
            }
        }
        Command::Logout => match session.auth().logout() {
            Ok(()) => println!("Logged out."),
            Err(e) => println!("! {}", e.user_message()),
        },
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

async fn add_pdf(session: &ChatSession, path: &Path) {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read file");
            println!("! Could not read {}: {e}", path.display());
            return;
        }
    };
    if session.ingestor().submit_pdf(&file_name, bytes).await.is_ok() {
        session.start_progress();
    }
}
