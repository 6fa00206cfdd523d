//! Line-oriented terminal adapter
//!
//! Parses one command per input line and draws each `SessionView` as plain
//! text. Holds no session state of its own.

use crate::runtime::{RuntimeError, SessionHandle};
use crate::state_machine::NoticeKind;
use crate::view::{Badge, Panel, SessionView};
use std::fmt;

pub const USAGE: &str = "Commands: register <voter-id> <name...> | select <candidate-id> | \
confirm | audit | back | reveal | quit";

/// Parsed command from user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { voter_id: String, name: String },
    Select { candidate_id: String },
    Confirm,
    Audit,
    Back,
    Reveal,
    Quit,
    /// Blank line
    Empty,
    Unknown { input: String },
    InvalidArgs { command: String, error: String },
}

/// Parse a user input line into a command
pub fn parse(input: &str) -> Command {
    let input = input.trim();
    let mut parts = input.split_whitespace();
    let Some(command) = parts.next() else {
        return Command::Empty;
    };

    match command.to_lowercase().as_str() {
        "register" => {
            let voter_id = parts.next();
            let name = parts.collect::<Vec<_>>().join(" ");
            match voter_id {
                Some(voter_id) if !name.is_empty() => Command::Register {
                    voter_id: voter_id.to_string(),
                    name,
                },
                _ => Command::InvalidArgs {
                    command: "register".into(),
                    error: "Usage: register <voter-id> <name...>".into(),
                },
            }
        }

        "select" => match parts.next() {
            Some(candidate_id) => Command::Select {
                candidate_id: candidate_id.to_string(),
            },
            None => Command::InvalidArgs {
                command: "select".into(),
                error: "Usage: select <candidate-id>".into(),
            },
        },

        "confirm" | "vote" => Command::Confirm,
        "audit" => Command::Audit,
        "back" => Command::Back,
        "reveal" => Command::Reveal,
        "quit" | "exit" => Command::Quit,

        _ => Command::Unknown {
            input: input.to_string(),
        },
    }
}

/// Forward a command to the session
pub async fn dispatch(
    handle: &SessionHandle,
    command: Command,
) -> Result<Dispatch, RuntimeError> {
    match command {
        Command::Register { voter_id, name } => handle.submit_identity(voter_id, name).await?,
        Command::Select { candidate_id } => handle.select(candidate_id).await?,
        Command::Confirm => handle.confirm_vote().await?,
        Command::Audit => handle.request_audit().await?,
        Command::Back => handle.go_back().await?,
        Command::Reveal => handle.toggle_reveal().await?,
        Command::Quit => {
            handle.shutdown().await;
            return Ok(Dispatch::Quit);
        }
        Command::Empty => {}
        Command::Unknown { input } => {
            return Ok(Dispatch::Hint(format!("Unknown command: {input}\n{USAGE}")));
        }
        Command::InvalidArgs { error, .. } => return Ok(Dispatch::Hint(error)),
    }
    Ok(Dispatch::Continue)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Hint(String),
    Quit,
}

// ============================================================================
// Rendering
// ============================================================================

/// Plain-text rendering of a view
pub struct Screen<'a>(pub &'a SessionView);

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;

        write!(f, "[{}]", view.connection.label)?;
        if let Some(voter) = &view.voter {
            write!(f, " voter: {} ({})", voter.display_name, voter.voter_id)?;
        }
        if view.busy {
            write!(f, " (waiting for server...)")?;
        }
        writeln!(f)?;

        let title = match view.panel {
            Panel::Identity => "Identify yourself",
            Panel::Voting => "Choose a candidate",
            Panel::Confirmation => "Vote recorded, live results",
            Panel::Audit => "Audit trail",
        };
        writeln!(f, "== {title} ==")?;

        if let Some(notice) = &view.notice {
            let marker = match notice.kind {
                NoticeKind::Error => '!',
                NoticeKind::Info => '*',
            };
            writeln!(f, "{marker} {}", notice.message)?;
        }

        if let Some(stats) = &view.stats {
            writeln!(
                f,
                "Votes: {} | Registered: {} | Voted: {} | Participation: {}%",
                stats.total_votes,
                stats.registered_voters,
                stats.voters_who_voted,
                stats.participation_pct
            )?;
        }

        if view.panel == Panel::Audit {
            write_audit(f, view)?;
        } else {
            for row in &view.candidates {
                let marker = if row.selected { '>' } else { ' ' };
                let badge = match &row.badge {
                    Badge::Image(image) => image.as_str(),
                    Badge::Initials(initials) => initials.as_str(),
                };
                writeln!(
                    f,
                    "{marker} {:<6} [{badge}] {} ({}) {} votes, {}%",
                    row.id, row.name, row.party_label, row.votes, row.share_pct
                )?;
            }
        }

        let hint = match view.panel {
            Panel::Identity => "register <voter-id> <name...>",
            Panel::Voting => "select <candidate-id>, confirm, back",
            Panel::Confirmation => "audit",
            Panel::Audit => "reveal, back",
        };
        write!(f, "-> {hint}")
    }
}

fn write_audit(f: &mut fmt::Formatter<'_>, view: &SessionView) -> fmt::Result {
    if !view.audit_loaded {
        return writeln!(f, "Loading audit...");
    }
    if view.audit.is_empty() {
        return writeln!(f, "No votes recorded yet");
    }
    for row in &view.audit {
        write!(
            f,
            "  {}  {}  {}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.hashed_voter,
            row.candidate_name
        )?;
        if let (Some(id), Some(name)) = (&row.real_voter_id, &row.voter_name) {
            write!(f, "  [{id} {name}]")?;
        }
        writeln!(f)?;
    }
    Ok(())
}
