//! Teacher input parsing.
//!
//! Each stdin line is one intent. Commands go to the current selection unless
//! the first argument is `@<clientId>`:
//!
//! ```text
//! lock                      lock every selected student
//! lock @a1b2c3 Eyes up      lock one student with a message
//! open https://docs.rs      open a tab for the selection
//! announce 10 Pack up       ten second announcement
//! closetab @a1b2c3 42       close tab 42 of one student
//! ```

use saber_sdk::command::DEFAULT_LOCK_MESSAGE;
use saber_sdk::{Command, SdkError, SortKey};

/// Usage text printed by `help`.
pub const HELP: &str = "\
Commands (target the selection, or one student with @<clientId>):
  list | stats | help | quit | reconnect
  filter [text]              sort name|status|activity
  select all|none|<id>...    deselect <id>...
  detail <id>                close
  lock [@id] [message]       unlock [@id]
  open [@id] <url>           focus [@id] <url>
  closetab [@id] [tabId]     announce [@id] <seconds> <message>
  block [@id] <pattern>...   send [@id] <command> [json]";

/// Who a command is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every selected student.
    Selected,
    /// One student.
    One(String),
}

/// A parsed teacher intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Print usage.
    Help,
    /// Print every card.
    List,
    /// Print session metrics.
    Stats,
    /// Exit.
    Quit,
    /// Reconnect with a fresh attempt budget.
    Reconnect,
    /// Change the filter.
    Filter(String),
    /// Change the sort key.
    Sort(SortKey),
    /// Select students.
    Select(Vec<String>),
    /// Deselect students.
    Deselect(Vec<String>),
    /// Select every displayed student.
    SelectAll,
    /// Clear the selection.
    SelectNone,
    /// Open the detail modal.
    Detail(String),
    /// Close the detail modal.
    CloseDetail,
    /// Close the active tab.
    CloseActiveTab(Target),
    /// Send a command.
    Send {
        /// Recipients.
        target: Target,
        /// Command.
        command: Command,
    },
}

/// Input errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// Unknown verb.
    #[error("unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    /// Required argument missing.
    #[error("missing {0}")]
    MissingArgument(&'static str),

    /// Argument was not a number.
    #[error("not a number: {0}")]
    InvalidNumber(String),

    /// Unknown sort key.
    #[error("{0}")]
    InvalidSort(String),

    /// Payload was not JSON.
    #[error("invalid json payload: {0}")]
    InvalidJson(String),

    /// Command arguments rejected.
    #[error(transparent)]
    Command(#[from] SdkError),
}

fn split_target<'a>(args: &'a [&'a str]) -> (Target, &'a [&'a str]) {
    if let Some((first, rest)) = args.split_first() {
        if let Some(id) = first.strip_prefix('@').filter(|id| !id.is_empty()) {
            return (Target::One(id.to_string()), rest);
        }
    }
    (Target::Selected, args)
}

fn first<'a>(args: &[&'a str], what: &'static str) -> Result<&'a str, InputError> {
    args.first().copied().ok_or(InputError::MissingArgument(what))
}

fn ids(args: &[&str]) -> Result<Vec<String>, InputError> {
    if args.is_empty() {
        return Err(InputError::MissingArgument("client id"));
    }
    Ok(args.iter().map(|s| (*s).to_string()).collect())
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns an error if the line is not a valid intent.
pub fn parse_line(line: &str) -> Result<Option<Intent>, InputError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let intent = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => Intent::Help,
        "list" | "ls" => Intent::List,
        "stats" => Intent::Stats,
        "quit" | "exit" => Intent::Quit,
        "reconnect" => Intent::Reconnect,
        "filter" => Intent::Filter(args.join(" ")),
        "sort" => {
            let key = first(args, "sort key")?;
            Intent::Sort(key.parse().map_err(InputError::InvalidSort)?)
        }
        "select" => match args {
            ["all"] => Intent::SelectAll,
            ["none"] => Intent::SelectNone,
            _ => Intent::Select(ids(args)?),
        },
        "deselect" => Intent::Deselect(ids(args)?),
        "detail" => Intent::Detail(first(args, "client id")?.to_string()),
        "close" => Intent::CloseDetail,
        "lock" => {
            let (target, rest) = split_target(args);
            let message = if rest.is_empty() {
                DEFAULT_LOCK_MESSAGE.to_string()
            } else {
                rest.join(" ")
            };
            Intent::Send {
                target,
                command: Command::LockScreen {
                    message: Some(message),
                },
            }
        }
        "unlock" => Intent::Send {
            target: split_target(args).0,
            command: Command::UnlockScreen,
        },
        "open" => {
            let (target, rest) = split_target(args);
            Intent::Send {
                target,
                command: Command::open_tab(first(rest, "url")?)?,
            }
        }
        "focus" => {
            let (target, rest) = split_target(args);
            Intent::Send {
                target,
                command: Command::focus_tab(first(rest, "url")?)?,
            }
        }
        "closetab" => {
            let (target, rest) = split_target(args);
            match rest.first() {
                Some(raw) => {
                    let tab_id = raw
                        .parse()
                        .map_err(|_| InputError::InvalidNumber((*raw).to_string()))?;
                    Intent::Send {
                        target,
                        command: Command::CloseTab { tab_id },
                    }
                }
                None => Intent::CloseActiveTab(target),
            }
        }
        "announce" => {
            let (target, rest) = split_target(args);
            let raw = first(rest, "duration in seconds")?;
            let seconds: u64 = raw
                .parse()
                .map_err(|_| InputError::InvalidNumber(raw.to_string()))?;
            let message = rest.get(1..).unwrap_or_default().join(" ");
            Intent::Send {
                target,
                command: Command::announcement(&message, seconds.saturating_mul(1000))?,
            }
        }
        "block" => {
            let (target, rest) = split_target(args);
            Intent::Send {
                target,
                command: Command::blocklist(&rest.join("\n"))?,
            }
        }
        "send" => {
            let (target, rest) = split_target(args);
            let name = first(rest, "command name")?.to_string();
            let payload = rest.get(1..).unwrap_or_default().join(" ");
            let data = if payload.is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&payload).map_err(|e| InputError::InvalidJson(e.to_string()))?
            };
            Intent::Send {
                target,
                command: Command::Other { name, data },
            }
        }
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };

    Ok(Some(intent))
}
