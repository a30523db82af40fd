//! `ask`, `chat` and `extract` command handlers.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tripdash_core::{embed_url, AppConfig, ChatTurn, LocationEntry};
use tripdash_explore::{extract_locations, ChatSession};
use tripdash_gemini::GeminiClient;

fn build_client(config: &AppConfig) -> anyhow::Result<GeminiClient> {
    let key = config
        .gemini_api_key
        .as_deref()
        .context("GEMINI_API_KEY is not set; add it to .env to use ask/chat")?;
    GeminiClient::with_base_url(
        key,
        &config.gemini_model,
        config.gemini_timeout_secs,
        &config.gemini_base_url,
    )
    .context("failed to build Gemini client")
}

/// One-shot explore query.
///
/// # Errors
///
/// Returns an error if the API key is missing, the query is blank, or JSON
/// output fails. API failures are not errors; they print the fallback reply.
pub(crate) async fn run_ask(config: &AppConfig, query: &str, json: bool) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let mut session = ChatSession::new(config.place_count);

    let Some(turn) = session.submit(&client, query).await? else {
        anyhow::bail!("query must not be blank");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(turn)?);
    } else {
        print_turn(turn, config.maps_api_key.as_deref(), Some(0));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ReplCommand<'a> {
    Quit,
    History,
    /// 1-based position in the most recent reply with places.
    Select(usize),
    Query(&'a str),
    Empty,
    Invalid(String),
}

pub(crate) fn parse_repl_command(line: &str) -> ReplCommand<'_> {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return ReplCommand::Query(line);
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("quit" | "q"), None, None) => ReplCommand::Quit,
        (Some("history"), None, None) => ReplCommand::History,
        (Some("select"), None, None) => {
            ReplCommand::Invalid("':select' needs a place number".to_string())
        }
        (Some("select"), Some(n), None) => match n.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Select(n),
            _ => ReplCommand::Invalid(format!("':select' needs a place number, got '{n}'")),
        },
        _ => ReplCommand::Invalid(format!("unknown command ':{command}'")),
    }
}

/// Interactive session on stdin until `:quit` or EOF.
///
/// # Errors
///
/// Returns an error if the API key is missing or stdin/stdout fail.
pub(crate) async fn run_chat(config: &AppConfig) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let maps_key = config.maps_api_key.as_deref();
    let mut session = ChatSession::new(config.place_count);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Where would you like to go? (:select N, :history, :quit)");
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_repl_command(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Empty => {}
            ReplCommand::Invalid(msg) => eprintln!("{msg}"),
            ReplCommand::History => print_history(&session),
            ReplCommand::Select(n) => select_latest(&mut session, n, maps_key),
            ReplCommand::Query(query) => {
                println!("thinking...");
                if session.submit(&client, query).await?.is_some() {
                    let selected = session.selected().map(|s| s.index);
                    if let Some(turn) = session.turns().last() {
                        print_turn(turn, maps_key, selected);
                    }
                }
            }
        }
    }
    Ok(())
}

fn select_latest(session: &mut ChatSession, n: usize, maps_key: Option<&str>) {
    let Some(turn) = session.turns().iter().rposition(ChatTurn::has_locations) else {
        eprintln!("no places to select yet");
        return;
    };
    match session.select(turn, n - 1) {
        Ok(place) => {
            println!("selected {}", describe(place, n - 1));
            if let Some(url) = embed_url(maps_key, place) {
                println!("  map: {url}");
            }
        }
        Err(e) => eprintln!("{e}"),
    }
}

fn print_history(session: &ChatSession) {
    if session.turns().is_empty() {
        println!("no messages yet");
        return;
    }
    for (i, turn) in session.turns().iter().enumerate() {
        let first_line = turn.text.lines().next().unwrap_or_default();
        println!(
            "[{i}] {:<9} {}  ({} places)",
            turn.role.to_string(),
            first_line,
            turn.locations.len()
        );
    }
}

/// Extract places from saved reply text.
///
/// # Errors
///
/// Returns an error if the input cannot be read or JSON output fails.
pub(crate) fn run_extract(config: &AppConfig, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let places = extract_locations(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&places)?);
    } else if places.is_empty() {
        println!("no locations found");
    } else {
        print_places(&places, config.maps_api_key.as_deref(), None);
    }
    Ok(())
}

fn print_turn(turn: &ChatTurn, maps_key: Option<&str>, selected: Option<usize>) {
    println!("{}", turn.text.trim_end());
    if turn.has_locations() {
        println!();
        println!("Places:");
        print_places(&turn.locations, maps_key, selected);
    }
}

fn print_places(places: &[LocationEntry], maps_key: Option<&str>, selected: Option<usize>) {
    for (i, place) in places.iter().enumerate() {
        let marker = if selected == Some(i) { '*' } else { ' ' };
        println!("{marker}{:>3}. {}", i + 1, describe(place, i));
    }
    if let Some(url) = selected
        .and_then(|i| places.get(i))
        .and_then(|place| embed_url(maps_key, place))
    {
        println!("  map: {url}");
    }
}

fn describe(place: &LocationEntry, index: usize) -> String {
    format!(
        "{} ({}, {})",
        place.label(index),
        place.latitude(),
        place.longitude()
    )
}
