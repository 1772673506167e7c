//! Console event loop.
//!
//! One task owns the [`DashboardSession`]. It waits on relay events, stdin
//! lines, the reconnect deadline and Ctrl-C, and applies whichever arrives
//! first.

use std::io::Write;

use saber_sdk::ws::Transport;
use saber_sdk::{
    CardModel, Command, DashboardSession, DashboardView, NoticeLevel, SdkError,
    TungsteniteTransport,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ConsoleConfig;
use crate::input::{parse_line, Intent, Target, HELP};
use crate::terminal::TerminalView;

/// Whether the loop keeps going after an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// Shut down.
    Quit,
}

/// Session driven by the console.
pub type ConsoleSession<T, W> = DashboardSession<T, TerminalView<W>>;

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs the console until Ctrl-C, `quit`, or the transport goes away.
///
/// # Errors
///
/// Returns an error if the session cannot be created.
pub async fn run(config: ConsoleConfig) -> anyhow::Result<()> {
    let ws_config = config.ws_config();
    let (transport, mut events) = TungsteniteTransport::new(ws_config.heartbeat_interval);
    let view = TerminalView::new(std::io::stdout());

    let mut session = DashboardSession::new(ws_config, transport, view)?
        .with_filter(config.filter.clone())
        .with_sort(config.sort);

    info!("Relay URL: {}", config.ws_url);
    info!(
        "Reconnect: every {}s, at most {} attempts",
        config.reconnect_delay_secs, config.max_reconnect_attempts
    );
    session.view_mut().print_lines("Type 'help' for commands.");
    session.start();

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let deadline = session.reconnect_deadline();

        tokio::select! {
            event = events.recv() => match event {
                Some(event) => session.handle_transport_event(event),
                None => {
                    warn!("Transport event channel closed");
                    break;
                }
            },
            line = input.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if handle_line(&mut session, &line) == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, continuing without input");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            () = wait_until(deadline) => {
                session.on_reconnect_timer();
            }
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down console");
    info!("Session metrics: {:?}", session.metrics().snapshot());
    Ok(())
}

/// Parses and applies one input line.
pub fn handle_line<T: Transport, W: Write>(session: &mut ConsoleSession<T, W>, line: &str) -> Flow {
    match parse_line(line) {
        Ok(Some(intent)) => apply_intent(session, intent),
        Ok(None) => Flow::Continue,
        Err(e) => {
            session.view_mut().notify(NoticeLevel::Warn, &e.to_string());
            Flow::Continue
        }
    }
}

fn report<T: Transport, W: Write, R>(
    session: &mut ConsoleSession<T, W>,
    result: Result<R, SdkError>,
) {
    match result {
        Ok(_) | Err(SdkError::NoTargets) => {}
        Err(e) => session.view_mut().notify(NoticeLevel::Error, &e.to_string()),
    }
}

/// Applies one intent to the session.
pub fn apply_intent<T: Transport, W: Write>(
    session: &mut ConsoleSession<T, W>,
    intent: Intent,
) -> Flow {
    match intent {
        Intent::Help => session.view_mut().print_lines(HELP),
        Intent::List => {
            let models: Vec<CardModel> = session.grid().cards().map(|(m, _)| m.clone()).collect();
            session.view_mut().print_cards(&models);
        }
        Intent::Stats => {
            let snapshot = session.metrics().snapshot();
            session.view_mut().print_stats(&snapshot);
        }
        Intent::Quit => return Flow::Quit,
        Intent::Reconnect => {
            if !session.reconnect_now() {
                session
                    .view_mut()
                    .notify(NoticeLevel::Warn, "Reconnect was not started.");
            }
        }
        Intent::Filter(filter) => session.set_filter(&filter),
        Intent::Sort(sort) => session.set_sort(sort),
        Intent::Select(ids) => select(session, &ids, true),
        Intent::Deselect(ids) => select(session, &ids, false),
        Intent::SelectAll => session.set_select_all(true),
        Intent::SelectNone => session.set_select_all(false),
        Intent::Detail(client_id) => {
            if !session.open_detail(&client_id) {
                session
                    .view_mut()
                    .notify(NoticeLevel::Warn, &format!("Student {client_id} not found."));
            }
        }
        Intent::CloseDetail => session.close_detail(),
        Intent::CloseActiveTab(Target::One(client_id)) => {
            let result = session.close_active_tab(&client_id);
            report(session, result);
        }
        Intent::CloseActiveTab(Target::Selected) => {
            let result = session.send_to_selected(&Command::CloseActiveTab);
            report(session, result);
        }
        Intent::Send {
            target: Target::One(client_id),
            command,
        } => {
            let result = session.send_to_one(&client_id, &command);
            report(session, result);
        }
        Intent::Send {
            target: Target::Selected,
            command,
        } => {
            let result = session.send_to_selected(&command);
            report(session, result);
        }
    }
    Flow::Continue
}

fn select<T: Transport, W: Write>(
    session: &mut ConsoleSession<T, W>,
    ids: &[String],
    selected: bool,
) {
    for client_id in ids {
        if !session.set_selected(client_id, selected) {
            session
                .view_mut()
                .notify(NoticeLevel::Warn, &format!("Student {client_id} not found."));
        }
    }
}
