//! Wire protocol shared by the server, the CLI and the web frontend.
//!
//! Realtime events travel as JSON text frames of the form
//! `{"event": "code-change", "data": {...}}`. Every event is a closed variant with
//! required fields; anything else is rejected with a validation error instead of
//! being forwarded with missing fields.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CodespaceError, ErrorKind, Result, SerializableError};
use crate::space::{PrivacyState, Space, SpaceFile};

/// Events sent by a client over its realtime connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Announce presence in a space. The passcode is re-checked by the server.
    #[serde(rename_all = "camelCase")]
    JoinSpace {
        space_name: String,
        #[serde(default)]
        passcode: Option<String>,
    },

    /// The active file was edited; `content` replaces the whole file.
    #[serde(rename_all = "camelCase")]
    CodeChange {
        space_name: String,
        file: String,
        content: String,
    },

    #[serde(rename_all = "camelCase")]
    CreateFile {
        space_name: String,
        file_name: String,
        #[serde(default)]
        language: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    DeleteFile {
        space_name: String,
        file_name: String,
    },

    /// Relay of a privacy change already persisted over HTTP.
    #[serde(rename_all = "camelCase")]
    PrivacyChange {
        space_name: String,
        is_public: bool,
        has_secret: bool,
    },

    /// A tab was closed locally. Advisory only.
    #[serde(rename_all = "camelCase")]
    FileClose {
        space_name: String,
        file_name: String,
    },

    #[serde(rename_all = "camelCase")]
    TerminalCommand { space_name: String, command: String },
}

impl ClientEvent {
    /// Parse and validate a text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let event: ClientEvent = serde_json::from_str(text)
            .map_err(|e| CodespaceError::Validation(format!("Malformed event: {}", e)))?;
        event.validate()?;
        Ok(event)
    }

    /// Reject events whose required string fields are empty.
    pub fn validate(&self) -> Result<()> {
        if self.space_name().trim().is_empty() {
            return Err(CodespaceError::missing("spaceName"));
        }
        match self {
            ClientEvent::CodeChange { file, .. } if file.is_empty() => {
                Err(CodespaceError::missing("file"))
            }
            ClientEvent::CreateFile { file_name, .. }
            | ClientEvent::DeleteFile { file_name, .. }
            | ClientEvent::FileClose { file_name, .. }
                if file_name.trim().is_empty() =>
            {
                Err(CodespaceError::missing("fileName"))
            }
            ClientEvent::TerminalCommand { command, .. } if command.trim().is_empty() => {
                Err(CodespaceError::missing("command"))
            }
            _ => Ok(()),
        }
    }

    /// The space (room) this event is addressed to
    pub fn space_name(&self) -> &str {
        match self {
            ClientEvent::JoinSpace { space_name, .. }
            | ClientEvent::CodeChange { space_name, .. }
            | ClientEvent::CreateFile { space_name, .. }
            | ClientEvent::DeleteFile { space_name, .. }
            | ClientEvent::PrivacyChange { space_name, .. }
            | ClientEvent::FileClose { space_name, .. }
            | ClientEvent::TerminalCommand { space_name, .. } => space_name,
        }
    }

    /// Wire name of the event, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinSpace { .. } => "join-space",
            ClientEvent::CodeChange { .. } => "code-change",
            ClientEvent::CreateFile { .. } => "create-file",
            ClientEvent::DeleteFile { .. } => "delete-file",
            ClientEvent::PrivacyChange { .. } => "privacy-change",
            ClientEvent::FileClose { .. } => "file-close",
            ClientEvent::TerminalCommand { .. } => "terminal-command",
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a closed enum of strings and bools cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Events delivered by the server to one or more connections of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    UserJoined { id: String },

    CodeUpdated { file: String, content: String },

    /// The full, authoritative file list after a creation.
    FileCreated { files: Vec<SpaceFile> },

    #[serde(rename_all = "camelCase")]
    FileDeleted {
        file_name: String,
        files: Vec<SpaceFile>,
    },

    #[serde(rename_all = "camelCase")]
    PrivacyUpdated { is_public: bool, has_secret: bool },

    #[serde(rename_all = "camelCase")]
    FileClosed { file_name: String },

    TerminalOutput { text: String },

    /// A request from this connection failed. Never broadcast.
    Error { kind: ErrorKind, message: String },
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| CodespaceError::Validation(format!("Malformed event: {}", e)))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn privacy_updated(state: PrivacyState) -> Self {
        ServerEvent::PrivacyUpdated {
            is_public: state.is_public,
            has_secret: state.has_secret,
        }
    }
}

impl From<&CodespaceError> for ServerEvent {
    fn from(err: &CodespaceError) -> Self {
        let SerializableError { kind, message } = err.to_serializable();
        ServerEvent::Error { kind, message }
    }
}

/// A space as sent to clients. The secret digest never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SpaceData {
    pub name: String,
    pub is_public: bool,
    #[serde(default)]
    pub has_secret: bool,
    #[serde(default)]
    pub files: Vec<SpaceFile>,
}

impl From<&Space> for SpaceData {
    fn from(space: &Space) -> Self {
        Self {
            name: space.name.clone(),
            is_public: space.is_public,
            has_secret: space.has_secret(),
            files: space.files.clone(),
        }
    }
}

impl From<Space> for SpaceData {
    fn from(space: Space) -> Self {
        SpaceData::from(&space)
    }
}

impl SpaceData {
    /// Same space with the file list withheld (for unauthenticated views).
    pub fn without_files(mut self) -> Self {
        self.files.clear();
        self
    }
}

// ==================== HTTP request/response bodies ====================

/// Body of the get-or-create request
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CreateSpaceRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of the verify and data requests
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PasscodeRequest {
    #[serde(default)]
    pub passcode: Option<String>,
}

/// Body of the privacy update request
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PrivacyRequest {
    pub is_public: bool,
    /// New passcode; required when making the space private
    #[serde(default)]
    pub passcode: Option<String>,
    /// Passcode the space is protected by now; required while it is private
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_passcode: Option<String>,
}

/// Body of the file deletion request
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeleteFileRequest {
    #[serde(default)]
    pub file: Option<String>,
}

/// Result of a passcode verification
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of a file deletion over HTTP
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeleteFileResponse {
    pub msg: String,
    pub codespace: SpaceData,
}

/// Error body returned by the HTTP surface
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ErrorResponse {
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_change() {
        let event = ClientEvent::parse(
            r#"{"event":"code-change","data":{"spaceName":"demo","file":"index.html","content":"X"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::CodeChange {
                space_name: "demo".into(),
                file: "index.html".into(),
                content: "X".into(),
            }
        );
        assert_eq!(event.space_name(), "demo");
        assert_eq!(event.name(), "code-change");
    }

    #[test]
    fn test_parse_join_without_passcode() {
        let event =
            ClientEvent::parse(r#"{"event":"join-space","data":{"spaceName":"demo"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSpace {
                space_name: "demo".into(),
                passcode: None,
            }
        );
    }

    #[test]
    fn test_create_file_language_is_optional() {
        let event = ClientEvent::parse(
            r#"{"event":"create-file","data":{"spaceName":"demo","fileName":"a.js"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ClientEvent::CreateFile { language: None, .. }));
    }

    #[test]
    fn test_rejects_missing_field() {
        let err = ClientEvent::parse(r#"{"event":"code-change","data":{"spaceName":"demo"}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_rejects_unknown_event() {
        let err = ClientEvent::parse(r#"{"event":"drop-tables","data":{"spaceName":"demo"}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_rejects_empty_names() {
        let err = ClientEvent::parse(r#"{"event":"join-space","data":{"spaceName":"  "}}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = ClientEvent::parse(
            r#"{"event":"delete-file","data":{"spaceName":"demo","fileName":""}}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_server_event_wire_shape() {
        let json = ServerEvent::FileDeleted {
            file_name: "a.js".into(),
            files: vec![],
        }
        .to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "file-deleted");
        assert_eq!(value["data"]["fileName"], "a.js");

        let json = ServerEvent::privacy_updated(PrivacyState {
            is_public: false,
            has_secret: true,
        })
        .to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "privacy-updated");
        assert_eq!(value["data"]["isPublic"], false);
        assert_eq!(value["data"]["hasSecret"], true);
    }

    #[test]
    fn test_error_event_from_error() {
        let event = ServerEvent::from(&CodespaceError::DisallowedCommand("rm".into()));
        match event {
            ServerEvent::Error { kind, .. } => assert_eq!(kind, ErrorKind::DisallowedCommand),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_space_data_hides_digest() {
        let mut space = Space::with_defaults("priv");
        space.set_privacy(false, Some("xyz")).unwrap();
        let json = serde_json::to_string(&SpaceData::from(&space)).unwrap();
        assert!(!json.contains(space.secret_hash.as_deref().unwrap()));
        assert!(json.contains("\"hasSecret\":true"));
    }
}
