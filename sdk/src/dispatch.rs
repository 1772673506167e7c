//! Command dispatch.
//!
//! Turns teacher intents into `teacher_command` envelopes. Bulk commands are
//! fanned out as one independent send per target with no rollback.

use tracing::{info, warn};

use crate::command::Command;
use crate::error::SdkError;
use crate::roster::RosterStore;
use crate::ws::{ClientMessage, CommandEnvelope, ConnectionManager, ConnectionStatus, Transport};

/// Destination for outbound messages.
pub trait CommandSink {
    /// Returns true if messages can currently be delivered.
    fn is_open(&self) -> bool;

    /// Sends a message; returns false if it was not sent.
    fn send_message(&mut self, msg: &ClientMessage) -> bool;
}

impl<T: Transport> CommandSink for ConnectionManager<T> {
    fn is_open(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    fn send_message(&mut self, msg: &ClientMessage) -> bool {
        self.send(msg)
    }
}

/// Result of a bulk send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Targets the command was written for.
    pub sent: Vec<String>,
    /// Targets the command could not be sent to.
    pub unsent: Vec<String>,
}

impl BatchOutcome {
    /// Returns the number of targets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.sent.len() + self.unsent.len()
    }

    /// Returns true if every target was sent to.
    #[must_use]
    pub fn all_sent(&self) -> bool {
        self.unsent.is_empty()
    }
}

/// Sends commands to students.
///
/// Borrows the sink and the roster for the duration of one intent.
#[derive(Debug)]
pub struct CommandDispatcher<'a, S> {
    sink: &'a mut S,
    roster: &'a mut RosterStore,
}

impl<'a, S: CommandSink> CommandDispatcher<'a, S> {
    /// Creates a dispatcher.
    pub fn new(sink: &'a mut S, roster: &'a mut RosterStore) -> Self {
        Self { sink, roster }
    }

    /// Sends a command to one student.
    ///
    /// Lock and unlock are reflected in the roster before the relay confirms
    /// them, as long as the connection is open. Returns whether the message
    /// was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the client ID or command name is empty.
    pub fn send_to_one(&mut self, client_id: &str, command: &Command) -> Result<bool, SdkError> {
        if client_id.is_empty() {
            return Err(SdkError::EmptyClientId);
        }
        let name = command.name();
        if name.is_empty() {
            return Err(SdkError::EmptyCommand);
        }

        if let Some(status) = command.optimistic_status() {
            if self.sink.is_open() {
                self.roster.apply_optimistic_status(client_id, status);
            }
        }

        info!("CMD -> {}: {}", client_id, name);
        let msg = ClientMessage::TeacherCommand(CommandEnvelope {
            target_client_id: client_id.to_string(),
            command: name.to_string(),
            data: command.data(),
        });
        Ok(self.sink.send_message(&msg))
    }

    /// Sends a command to every target, one message each.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no targets or the command name is empty.
    pub fn send_to_many<I>(
        &mut self,
        client_ids: I,
        command: &Command,
    ) -> Result<BatchOutcome, SdkError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        if command.name().is_empty() {
            return Err(SdkError::EmptyCommand);
        }

        let mut outcome = BatchOutcome::default();
        for client_id in client_ids {
            let client_id = client_id.as_ref();
            match self.send_to_one(client_id, command) {
                Ok(true) => outcome.sent.push(client_id.to_string()),
                Ok(false) => outcome.unsent.push(client_id.to_string()),
                Err(e) => {
                    warn!("Skipping target {:?}: {}", client_id, e);
                    outcome.unsent.push(client_id.to_string());
                }
            }
        }

        if outcome.total() == 0 {
            return Err(SdkError::NoTargets);
        }

        info!(
            "Bulk CMD -> {} students: {} ({} unsent)",
            outcome.total(),
            command.name(),
            outcome.unsent.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{StudentStatus, StudentSummary};

    #[derive(Debug, Default)]
    struct RecordingSink {
        open: bool,
        sent: Vec<serde_json::Value>,
        fail_after: Option<usize>,
    }

    impl CommandSink for RecordingSink {
        fn is_open(&self) -> bool {
            self.open
        }

        fn send_message(&mut self, msg: &ClientMessage) -> bool {
            if !self.open || self.fail_after.is_some_and(|n| self.sent.len() >= n) {
                return false;
            }
            self.sent
                .push(serde_json::to_value(msg).expect("serialize"));
            true
        }
    }

    fn open_sink() -> RecordingSink {
        RecordingSink {
            open: true,
            ..RecordingSink::default()
        }
    }

    fn roster_with(ids: &[&str]) -> RosterStore {
        let mut roster = RosterStore::new();
        roster.apply_snapshot(
            ids.iter()
                .map(|id| StudentSummary::new(*id, format!("{id}@school.org")))
                .collect(),
        );
        roster
    }

    #[test]
    fn test_send_to_one_envelope() {
        let mut sink = open_sink();
        let mut roster = roster_with(&["a"]);
        let mut dispatcher = CommandDispatcher::new(&mut sink, &mut roster);

        let sent = dispatcher
            .send_to_one("a", &Command::CloseTab { tab_id: 7 })
            .expect("send");
        assert!(sent);
        assert_eq!(
            sink.sent,
            vec![json!({
                "type": "teacher_command",
                "data": { "targetClientId": "a", "command": "close_tab", "data": { "tabId": 7 } }
            })]
        );
    }

    #[test]
    fn test_send_to_one_requires_ids() {
        let mut sink = open_sink();
        let mut roster = RosterStore::new();
        let mut dispatcher = CommandDispatcher::new(&mut sink, &mut roster);

        assert_eq!(
            dispatcher.send_to_one("", &Command::UnlockScreen),
            Err(SdkError::EmptyClientId)
        );
        let nameless = Command::Other {
            name: String::new(),
            data: json!({}),
        };
        assert_eq!(
            dispatcher.send_to_one("a", &nameless),
            Err(SdkError::EmptyCommand)
        );
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn test_lock_is_optimistic() {
        let mut sink = open_sink();
        let mut roster = roster_with(&["a"]);
        CommandDispatcher::new(&mut sink, &mut roster)
            .send_to_one("a", &Command::lock())
            .expect("send");

        let record = roster.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Locked);
        assert!(record.is_provisional());

        roster.apply_status("a", StudentStatus::Locked);
        let record = roster.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Locked);
        assert!(!record.is_provisional());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_no_optimistic_update_when_closed() {
        let mut sink = RecordingSink::default();
        let mut roster = roster_with(&["a"]);
        let sent = CommandDispatcher::new(&mut sink, &mut roster)
            .send_to_one("a", &Command::lock())
            .expect("send");

        assert!(!sent);
        assert_eq!(
            roster.get("a").map(|r| r.status),
            Some(StudentStatus::Connected)
        );
    }

    #[test]
    fn test_send_to_many_fans_out() {
        let mut sink = open_sink();
        let mut roster = roster_with(&["a", "b", "c"]);
        let outcome = CommandDispatcher::new(&mut sink, &mut roster)
            .send_to_many(["a", "b", "c"], &Command::CloseActiveTab)
            .expect("send");

        assert!(outcome.all_sent());
        assert_eq!(outcome.total(), 3);
        assert_eq!(sink.sent.len(), 3);
        assert_eq!(sink.sent[1]["data"]["targetClientId"], "b");
    }

    #[test]
    fn test_send_to_many_partial_failure() {
        let mut sink = RecordingSink {
            open: true,
            fail_after: Some(1),
            ..RecordingSink::default()
        };
        let mut roster = roster_with(&["a", "b"]);
        let outcome = CommandDispatcher::new(&mut sink, &mut roster)
            .send_to_many(vec!["a".to_string(), "b".to_string()], &Command::lock())
            .expect("send");

        assert_eq!(outcome.sent, vec!["a".to_string()]);
        assert_eq!(outcome.unsent, vec!["b".to_string()]);
        // No rollback: both were applied optimistically.
        assert_eq!(
            roster.get("b").map(|r| r.status),
            Some(StudentStatus::Locked)
        );
    }

    #[test]
    fn test_send_to_many_without_targets() {
        let mut sink = open_sink();
        let mut roster = RosterStore::new();
        let targets: Vec<String> = Vec::new();
        assert_eq!(
            CommandDispatcher::new(&mut sink, &mut roster).send_to_many(targets, &Command::lock()),
            Err(SdkError::NoTargets)
        );
    }
}
