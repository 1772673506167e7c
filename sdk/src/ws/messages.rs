//! WebSocket message types.
//!
//! Every frame in both directions is a JSON envelope `{ "type": ..., "data": ... }`.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{tabs_by_id, StudentStatus, StudentSummary, TabInfo};

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Identifies this connection as the teacher; the relay answers with the
    /// full roster.
    TeacherConnect {},
    /// Command relayed to one student.
    TeacherCommand(CommandEnvelope),
}

/// Payload of a `teacher_command` message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    /// Target student.
    pub target_client_id: String,
    /// Command name.
    pub command: String,
    /// Command-specific payload.
    pub data: serde_json::Value,
}

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Full roster after connecting.
    InitialStudentList(Vec<StudentSummary>),
    /// A student joined.
    StudentConnected(StudentSummary),
    /// A student left.
    StudentDisconnected {
        /// Client ID.
        client_id: String,
    },
    /// New screenshot.
    StudentScreenshot {
        /// Client ID.
        client_id: String,
        /// Image data URL.
        image_data: String,
    },
    /// Screenshot failed or was skipped.
    StudentScreenshotUnavailable {
        /// Client ID.
        client_id: String,
        /// Reported reason.
        reason: String,
    },
    /// Full tab list.
    StudentTabsUpdate {
        /// Client ID.
        client_id: String,
        /// Tabs keyed by ID.
        tabs: BTreeMap<i64, TabInfo>,
    },
    /// Tabs created or updated.
    StudentTabsChanged {
        /// Client ID.
        client_id: String,
        /// Changed tabs keyed by ID.
        tabs: BTreeMap<i64, TabInfo>,
    },
    /// A tab was closed.
    StudentTabRemoved {
        /// Client ID.
        client_id: String,
        /// Closed tab ID.
        tab_id: i64,
    },
    /// Student confirmed a status change.
    StudentStatusUpdate {
        /// Client ID.
        client_id: String,
        /// New status.
        status: StudentStatus,
    },
    /// Relay could not deliver a command.
    CommandFailed {
        /// Target of the failed command.
        target_client_id: Option<String>,
        /// Failure reason.
        reason: Option<String>,
    },
    /// Acknowledgement.
    ServerAck {
        /// Optional message.
        message: Option<String>,
    },
    /// Server error.
    Error {
        /// Error message.
        message: String,
    },
    /// Keepalive response.
    Pong,
}

/// Message parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// Frame was not a JSON envelope.
    #[error("invalid json: {0}")]
    Json(String),

    /// Envelope type is not handled.
    #[error("unhandled message type: {0}")]
    UnknownType(String),

    /// Data did not match the expected shape.
    #[error("invalid '{kind}' data: {reason}")]
    InvalidData {
        /// Envelope type.
        kind: String,
        /// Parse failure.
        reason: String,
    },

    /// Data had an empty or missing client ID.
    #[error("'{0}' message missing clientId")]
    MissingClientId(String),
}

/// Phrase the relay uses to reject a second teacher session.
pub const DUPLICATE_SESSION_MARKER: &str = "Another teacher session is active";

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientRef {
    #[serde(default)]
    client_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Relayed<P> {
    #[serde(default)]
    client_id: String,
    payload: P,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotPayload {
    image_data: String,
}

#[derive(Deserialize, Default)]
struct ScreenshotIssue {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayedIssue {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    payload: Option<ScreenshotIssue>,
}

#[derive(Deserialize)]
struct StatusPayload {
    status: StudentStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabRemovedPayload {
    tab_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandFailedData {
    #[serde(default)]
    target_client_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct MessageData {
    #[serde(default)]
    message: Option<String>,
}

fn data_as<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, MessageError> {
    serde_json::from_value(data).map_err(|e| MessageError::InvalidData {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn require_id(kind: &str, client_id: String) -> Result<String, MessageError> {
    if client_id.is_empty() {
        Err(MessageError::MissingClientId(kind.to_string()))
    } else {
        Ok(client_id)
    }
}

impl ServerEvent {
    /// Parses a text frame into an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON, has an unknown type, or
    /// is missing required fields.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| MessageError::Json(e.to_string()))?;
        Self::from_envelope(&envelope.kind, envelope.data)
    }

    fn from_envelope(kind: &str, data: serde_json::Value) -> Result<Self, MessageError> {
        match kind {
            "initial_student_list" => {
                let entries: Vec<serde_json::Value> = data_as(kind, data)?;
                let students = entries
                    .into_iter()
                    .filter_map(|entry| match serde_json::from_value::<StudentSummary>(entry) {
                        Ok(summary) if !summary.client_id.is_empty() => Some(summary),
                        Ok(_) | Err(_) => {
                            warn!("Ignoring invalid student entry in initial list");
                            None
                        }
                    })
                    .collect();
                Ok(Self::InitialStudentList(students))
            }
            "student_connected" => {
                let summary: StudentSummary = data_as(kind, data)?;
                require_id(kind, summary.client_id.clone())?;
                Ok(Self::StudentConnected(summary))
            }
            "student_disconnected" => {
                let r: ClientRef = data_as(kind, data)?;
                Ok(Self::StudentDisconnected {
                    client_id: require_id(kind, r.client_id)?,
                })
            }
            "student_screenshot" => {
                let r: Relayed<ScreenshotPayload> = data_as(kind, data)?;
                Ok(Self::StudentScreenshot {
                    client_id: require_id(kind, r.client_id)?,
                    image_data: r.payload.image_data,
                })
            }
            "student_screenshot_error" | "student_screenshot_skipped" => {
                let r: RelayedIssue = data_as(kind, data)?;
                let issue = r.payload.unwrap_or_default();
                Ok(Self::StudentScreenshotUnavailable {
                    client_id: require_id(kind, r.client_id)?,
                    reason: issue
                        .error
                        .or(issue.reason)
                        .unwrap_or_else(|| "Screenshot unavailable".to_string()),
                })
            }
            "student_tabs_update" => {
                let r: Relayed<HashMap<String, TabInfo>> = data_as(kind, data)?;
                Ok(Self::StudentTabsUpdate {
                    client_id: require_id(kind, r.client_id)?,
                    tabs: tabs_by_id(r.payload),
                })
            }
            "student_tab_created" | "student_tab_updated" => {
                let r: Relayed<HashMap<String, TabInfo>> = data_as(kind, data)?;
                Ok(Self::StudentTabsChanged {
                    client_id: require_id(kind, r.client_id)?,
                    tabs: tabs_by_id(r.payload),
                })
            }
            "student_tab_removed" => {
                let r: Relayed<TabRemovedPayload> = data_as(kind, data)?;
                Ok(Self::StudentTabRemoved {
                    client_id: require_id(kind, r.client_id)?,
                    tab_id: r.payload.tab_id,
                })
            }
            "student_status_update" => {
                let r: Relayed<StatusPayload> = data_as(kind, data)?;
                if r.payload.status == StudentStatus::Unknown {
                    return Err(MessageError::InvalidData {
                        kind: kind.to_string(),
                        reason: "unrecognised status".to_string(),
                    });
                }
                Ok(Self::StudentStatusUpdate {
                    client_id: require_id(kind, r.client_id)?,
                    status: r.payload.status,
                })
            }
            "command_failed" => {
                let d: CommandFailedData = data_as(kind, data)?;
                Ok(Self::CommandFailed {
                    target_client_id: d.target_client_id,
                    reason: d.reason,
                })
            }
            "server_ack" => {
                let d: MessageData = if data.is_null() {
                    MessageData::default()
                } else {
                    data_as(kind, data)?
                };
                Ok(Self::ServerAck { message: d.message })
            }
            "error" => {
                let d: MessageData = if data.is_null() {
                    MessageData::default()
                } else {
                    data_as(kind, data)?
                };
                Ok(Self::Error {
                    message: d.message.unwrap_or_else(|| "Unknown error".to_string()),
                })
            }
            "pong" => Ok(Self::Pong),
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }

    /// Returns true if this is the relay rejecting a duplicate teacher session.
    #[must_use]
    pub fn is_duplicate_session(&self) -> bool {
        matches!(self, Self::Error { message } if message.contains(DUPLICATE_SESSION_MARKER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_connect_serialize() {
        let json = serde_json::to_string(&ClientMessage::TeacherConnect {}).expect("serialize");
        assert_eq!(json, r#"{"type":"teacher_connect","data":{}}"#);
    }

    #[test]
    fn test_teacher_command_serialize() {
        let msg = ClientMessage::TeacherCommand(CommandEnvelope {
            target_client_id: "a".to_string(),
            command: "open_tab".to_string(),
            data: serde_json::json!({ "url": "https://example.com" }),
        });
        let value = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(value["type"], "teacher_command");
        assert_eq!(value["data"]["targetClientId"], "a");
        assert_eq!(value["data"]["command"], "open_tab");
        assert_eq!(value["data"]["data"]["url"], "https://example.com");
    }

    #[test]
    fn test_parse_initial_list_skips_invalid() {
        let json = r#"{"type":"initial_student_list","data":[{"clientId":"a","email":"a@x.org"},{"email":"nobody"},{"clientId":"b"}]}"#;
        match ServerEvent::parse(json).expect("parse") {
            ServerEvent::InitialStudentList(students) => {
                assert_eq!(students.len(), 2);
                assert_eq!(students[0].client_id, "a");
                assert!(students[1].email.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_screenshot() {
        let json = r#"{"type":"student_screenshot","data":{"clientId":"a","payload":{"imageData":"data:image/jpeg;base64,AA"}}}"#;
        assert_eq!(
            ServerEvent::parse(json).expect("parse"),
            ServerEvent::StudentScreenshot {
                client_id: "a".to_string(),
                image_data: "data:image/jpeg;base64,AA".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_screenshot_missing_image_is_error() {
        let json = r#"{"type":"student_screenshot","data":{"clientId":"a","payload":{}}}"#;
        assert!(matches!(
            ServerEvent::parse(json),
            Err(MessageError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_parse_screenshot_skipped_reason() {
        let json = r#"{"type":"student_screenshot_skipped","data":{"clientId":"a","payload":{"reason":"tab hidden"}}}"#;
        assert_eq!(
            ServerEvent::parse(json).expect("parse"),
            ServerEvent::StudentScreenshotUnavailable {
                client_id: "a".to_string(),
                reason: "tab hidden".to_string(),
            }
        );

        let json = r#"{"type":"student_screenshot_error","data":{"clientId":"a"}}"#;
        match ServerEvent::parse(json).expect("parse") {
            ServerEvent::StudentScreenshotUnavailable { reason, .. } => {
                assert_eq!(reason, "Screenshot unavailable");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tabs_update() {
        let json = r#"{"type":"student_tabs_update","data":{"clientId":"a","payload":{"5":{"id":5,"title":"Docs","url":"https://docs.rs","active":true}}}}"#;
        match ServerEvent::parse(json).expect("parse") {
            ServerEvent::StudentTabsUpdate { client_id, tabs } => {
                assert_eq!(client_id, "a");
                assert!(tabs.get(&5).is_some_and(|t| t.active));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_tab_removed() {
        let json = r#"{"type":"student_tab_removed","data":{"clientId":"a","payload":{"tabId":9}}}"#;
        assert_eq!(
            ServerEvent::parse(json).expect("parse"),
            ServerEvent::StudentTabRemoved {
                client_id: "a".to_string(),
                tab_id: 9,
            }
        );
    }

    #[test]
    fn test_parse_status_update() {
        let json = r#"{"type":"student_status_update","data":{"clientId":"a","payload":{"status":"locked"}}}"#;
        assert_eq!(
            ServerEvent::parse(json).expect("parse"),
            ServerEvent::StudentStatusUpdate {
                client_id: "a".to_string(),
                status: StudentStatus::Locked,
            }
        );

        let json = r#"{"type":"student_status_update","data":{"clientId":"a","payload":{"status":"asleep"}}}"#;
        assert!(ServerEvent::parse(json).is_err());
    }

    #[test]
    fn test_parse_missing_client_id() {
        let json = r#"{"type":"student_disconnected","data":{}}"#;
        assert_eq!(
            ServerEvent::parse(json),
            Err(MessageError::MissingClientId("student_disconnected".to_string()))
        );
    }

    #[test]
    fn test_parse_command_failed() {
        let json = r#"{"type":"command_failed","data":{"targetClientId":"a","reason":"Student not connected"}}"#;
        assert_eq!(
            ServerEvent::parse(json).expect("parse"),
            ServerEvent::CommandFailed {
                target_client_id: Some("a".to_string()),
                reason: Some("Student not connected".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_pong_without_data() {
        assert_eq!(
            ServerEvent::parse(r#"{"type":"pong"}"#).expect("parse"),
            ServerEvent::Pong
        );
    }

    #[test]
    fn test_parse_duplicate_session_error() {
        let json = r#"{"type":"error","data":{"message":"Another teacher session is active."}}"#;
        let event = ServerEvent::parse(json).expect("parse");
        assert!(event.is_duplicate_session());

        let json = r#"{"type":"error","data":{"message":"Rate limited"}}"#;
        assert!(!ServerEvent::parse(json).expect("parse").is_duplicate_session());
    }

    #[test]
    fn test_parse_unknown_and_garbage() {
        assert_eq!(
            ServerEvent::parse(r#"{"type":"weather","data":{}}"#),
            Err(MessageError::UnknownType("weather".to_string()))
        );
        assert!(matches!(
            ServerEvent::parse("not json"),
            Err(MessageError::Json(_))
        ));
    }
}
