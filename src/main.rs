// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod render;

use std::io::{self, IsTerminal, Read};

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use parley_config::{Config, Settings};
use parley_core::run_turn;
use parley_segment::segment;
use parley_store::{load_settings, save_settings, FileKv, Role, SearchOutcome, Session, SessionStore};
use render::render_segments;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let config = parley_config::load(cli.config.as_deref())?;
    let kv = FileKv::new(config.storage.resolved_data_dir());
    debug!(data_dir = %kv.dir().display(), "using data directory");
    let settings = load_settings(&kv, Settings::from_config(&config));

    match cli.command {
        Commands::Completions { .. } => Ok(()),
        Commands::ShowConfig => {
            println!("{}", serde_yaml::to_string(&config).unwrap_or_default());
            println!("# persisted chat settings ({})", kv.dir().display());
            println!("{}", serde_yaml::to_string(&settings).unwrap_or_default());
            Ok(())
        }
        Commands::Set { model, temperature, max_tokens, system_prompt } => {
            let mut updated = settings;
            if let Some(m) = model {
                updated.model = m;
            }
            if let Some(t) = temperature {
                if !(0.0..=2.0).contains(&t) {
                    bail!("temperature must be between 0.0 and 2.0, got {t}");
                }
                updated.temperature = t;
            }
            if let Some(n) = max_tokens {
                updated.max_tokens = (n > 0).then_some(n);
            }
            if let Some(p) = system_prompt {
                updated.system_prompt = p;
            }
            save_settings(&kv, &updated).context("saving chat settings")?;
            println!("{}", serde_yaml::to_string(&updated).unwrap_or_default());
            Ok(())
        }
        command => {
            let mut store = SessionStore::open(Box::new(kv));
            run_session_command(command, &mut store, &config, &settings).await
        }
    }
}

async fn run_session_command(
    command: Commands,
    store: &mut SessionStore,
    config: &Config,
    settings: &Settings,
) -> anyhow::Result<()> {
    match command {
        Commands::Send { text, session } => {
            let input = read_input(text)?;
            let id = match session {
                Some(arg) => resolve_id(store, &arg)?,
                None => current_id(store)?,
            };
            let completer = parley_model::from_config(&config.model)?;
            let outcome = run_turn(store, completer.as_ref(), settings, &id, &input, Utc::now).await?;
            println!("{}", render_segments(&segment(&outcome.reply)));
            if outcome.upstream_failed {
                eprintln!("(the reply could not be generated; run with -v for details)");
            }
        }
        Commands::New { title } => {
            let id = store.create(title.as_deref().unwrap_or("")).id.clone();
            store.select(&id)?;
            println!("{id}");
        }
        Commands::List { limit } => print_sessions(store, &store.list_by_recency(), limit),
        Commands::Search { query } => match store.search_outcome(&query) {
            SearchOutcome::None => println!("No sessions match {query:?}."),
            SearchOutcome::Single(id) => {
                store.select(&id)?;
                if let Some(s) = store.get(&id) {
                    println!("Selected {}  {}", s.id, s.display_title());
                }
            }
            SearchOutcome::Many(_) => {
                let hits = store.search(&query);
                print_sessions(store, &hits, hits.len());
                println!("Several sessions match; pick one with `parley select <ID>`.");
            }
        },
        Commands::Select { id } => {
            let id = resolve_id(store, &id)?;
            store.select(&id)?;
        }
        Commands::Rename { id, title } => {
            let id = resolve_id(store, &id)?;
            store.rename(&id, &title)?;
        }
        Commands::Delete { id } => {
            let id = resolve_id(store, &id)?;
            store.delete(&id);
        }
        Commands::Show { id, json } => {
            let id = match id {
                Some(arg) => resolve_id(store, &arg)?,
                None => current_id(store)?,
            };
            let session = store.get(&id).ok_or_else(|| anyhow!("session {id} not found"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&session_json(session))?);
            } else {
                print_session(session);
            }
        }
        Commands::Set { .. } | Commands::ShowConfig | Commands::Completions { .. } => {}
    }
    Ok(())
}

fn current_id(store: &SessionStore) -> anyhow::Result<String> {
    store
        .current_id()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no current session"))
}

/// Accept a full session id or a unique prefix of one.
fn resolve_id(store: &SessionStore, arg: &str) -> anyhow::Result<String> {
    if store.get(arg).is_some() {
        return Ok(arg.to_string());
    }
    let matches: Vec<&Session> = store.sessions().iter().filter(|s| s.id.starts_with(arg)).collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("no session with id {arg:?}"),
        many => bail!("id prefix {arg:?} is ambiguous ({} sessions match)", many.len()),
    }
}

fn read_input(text: Option<String>) -> anyhow::Result<String> {
    let input = match text {
        Some(t) => t,
        None if io::stdin().is_terminal() => bail!("no message given; pass TEXT or pipe it on stdin"),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading message from stdin")?;
            buf
        }
    };
    if input.trim().is_empty() {
        bail!("message is empty");
    }
    Ok(input)
}

fn print_sessions(store: &SessionStore, sessions: &[&Session], limit: usize) {
    if sessions.is_empty() {
        println!("No sessions.");
        return;
    }
    let current = store.current_id();
    println!("  {:<36}  {:<16}  {:<5}  TITLE", "ID", "UPDATED", "MSGS");
    println!("{}", "-".repeat(95));
    for s in sessions.iter().take(limit) {
        let marker = if current == Some(s.id.as_str()) { '*' } else { ' ' };
        let date = s.updated_at.format("%Y-%m-%d %H:%M");
        let title = if s.display_title().chars().count() > 40 {
            format!("{}…", s.display_title().chars().take(39).collect::<String>())
        } else {
            s.display_title().to_string()
        };
        println!("{marker} {:<36}  {:<16}  {:<5}  {}", s.id, date, s.messages.len(), title);
    }
    if sessions.len() > limit {
        println!("\n… {} more (use -n to show more)", sessions.len() - limit);
    }
}

fn print_session(session: &Session) {
    println!("# {}\n", session.display_title());
    for m in &session.messages {
        match m.role {
            Role::User => println!("## You\n\n{}\n", m.content),
            Role::Assistant => println!("## Assistant\n\n{}\n", render_segments(&segment(&m.content))),
        }
    }
}

/// A session with each assistant reply expanded into its segments.
fn session_json(session: &Session) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = session
        .messages
        .iter()
        .map(|m| {
            let mut v = json!({
                "role": m.role,
                "content": m.content,
                "createdAt": m.created_at,
            });
            if m.role == Role::Assistant {
                v["segments"] = json!(segment(&m.content));
            }
            v
        })
        .collect();
    json!({
        "id": session.id,
        "title": session.title,
        "createdAt": session.created_at,
        "updatedAt": session.updated_at,
        "messages": messages,
    })
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
