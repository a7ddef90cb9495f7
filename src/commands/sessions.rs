//! Session management commands
//!
//! Lists and deletes saved chat sessions. Session ids may be given as any
//! unique prefix of the full UUID.

use crate::cli::SessionsCommand;
use crate::error::{KaviraError, Result};
use crate::session::{ChatSession, SessionStore};
use chrono::{Local, TimeZone, Utc};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle sessions subcommands
pub fn handle_sessions(command: SessionsCommand, store: &SessionStore) -> Result<()> {
    match command {
        SessionsCommand::List => {
            let sessions = store.load();
            print_session_table(&sessions);
        }
        SessionsCommand::Delete { id } => {
            let sessions = store.load();
            let full_id = resolve_session_id(&sessions, &id)?;
            if store.delete_by_id(&full_id)? {
                let short = &full_id[..full_id.len().min(8)];
                println!("{}", format!("Deleted session {}", short).green());
            } else {
                println!("{}", format!("No session found for {}", id).yellow());
            }
        }
    }

    Ok(())
}

/// Print the saved sessions as a table, newest first
pub fn print_session_table(sessions: &[ChatSession]) {
    if sessions.is_empty() {
        println!("{}", "No saved sessions.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Mode".bold(),
        "Messages".bold(),
        "Updated".bold()
    ]);

    for session in sessions {
        table.add_row(prettytable::row![
            session.short_id().cyan(),
            session.title,
            session.mode.to_string(),
            session.messages.len(),
            format_timestamp(session.timestamp)
        ]);
    }

    println!("\nSaved Sessions:");
    table.printstd();
    println!();
    println!("Use {} inside chat to resume one.", "/load <ID>".cyan());
    println!();
}

/// Resolve a user-supplied id or prefix to a full session id
///
/// # Errors
///
/// Returns `KaviraError::InvalidInput` when the prefix matches no session
/// or more than one.
pub fn resolve_session_id(sessions: &[ChatSession], id_or_prefix: &str) -> Result<String> {
    let needle = id_or_prefix.trim().to_lowercase();
    if needle.is_empty() {
        return Err(KaviraError::InvalidInput("Empty session id".to_string()).into());
    }

    let matches: Vec<&ChatSession> = sessions
        .iter()
        .filter(|s| s.id.to_lowercase().starts_with(&needle))
        .collect();

    match matches.len() {
        0 => Err(KaviraError::InvalidInput(format!(
            "No session matches '{}'",
            id_or_prefix
        ))
        .into()),
        1 => Ok(matches[0].id.clone()),
        n => Err(KaviraError::InvalidInput(format!(
            "'{}' is ambiguous ({} sessions match)",
            id_or_prefix, n
        ))
        .into()),
    }
}

fn format_timestamp(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => dt
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        None => "-".to_string(),
    }
}
