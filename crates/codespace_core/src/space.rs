//! Spaces and the files they contain.
//!
//! A [`Space`] is identified by its name, which doubles as the room key on the
//! realtime bus. Files are ordered by insertion and keyed by name within a space.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::access;
use crate::error::{CodespaceError, Result};

/// Name of the file every new space is seeded with.
pub const DEFAULT_FILE_NAME: &str = "index.html";

/// Language tag of the seeded file.
pub const DEFAULT_FILE_LANGUAGE: &str = "html";

/// Content of the seeded file.
pub const DEFAULT_FILE_CONTENT: &str = "<h1>Welcome to your new CodeSpace!</h1>";

/// Language tag used when a file name carries no extension.
pub const PLAINTEXT_LANGUAGE: &str = "plaintext";

/// A single file in a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpaceFile {
    /// File name, unique within its space
    pub name: String,
    /// Language tag used by editors for highlighting
    pub language: String,
    /// Full text content
    #[serde(default)]
    pub content: String,
}

impl SpaceFile {
    /// Create an empty file, deriving the language from the extension when none is given.
    pub fn new(name: impl Into<String>, language: Option<&str>) -> Self {
        let name = name.into();
        let language = match language.map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => language_for(&name),
        };
        Self {
            name,
            language,
            content: String::new(),
        }
    }

    /// The file every space starts with.
    pub fn default_file() -> Self {
        Self {
            name: DEFAULT_FILE_NAME.to_string(),
            language: DEFAULT_FILE_LANGUAGE.to_string(),
            content: DEFAULT_FILE_CONTENT.to_string(),
        }
    }
}

/// A named collaborative space as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub name: String,
    pub is_public: bool,
    /// SHA-256 digest of the passcode (hex). Ignored while the space is public.
    pub secret_hash: Option<String>,
    pub files: Vec<SpaceFile>,
}

impl Space {
    /// A new public space holding only the default file.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_public: true,
            secret_hash: None,
            files: vec![SpaceFile::default_file()],
        }
    }

    /// Whether a passcode digest is stored
    pub fn has_secret(&self) -> bool {
        self.secret_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Look up a file by name
    pub fn file(&self, name: &str) -> Option<&SpaceFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn status(&self) -> SpaceStatus {
        SpaceStatus {
            is_public: self.is_public,
        }
    }

    pub fn privacy(&self) -> PrivacyState {
        PrivacyState {
            is_public: self.is_public,
            has_secret: self.has_secret(),
        }
    }

    /// Apply a privacy change in memory, enforcing that private spaces carry a secret.
    pub fn set_privacy(&mut self, is_public: bool, secret: Option<&str>) -> Result<PrivacyState> {
        let update = PrivacyUpdate::new(is_public, secret)?;
        self.is_public = update.is_public;
        self.secret_hash = update.secret_hash;
        Ok(self.privacy())
    }
}

/// Public/private flag only, as returned by the status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatus {
    pub is_public: bool,
}

/// Privacy flags reported after a privacy change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct PrivacyState {
    pub is_public: bool,
    pub has_secret: bool,
}

/// A validated privacy change, ready to be written as one atomic update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyUpdate {
    pub is_public: bool,
    pub secret_hash: Option<String>,
}

impl PrivacyUpdate {
    /// Validate and digest a requested privacy change.
    ///
    /// A private space must be given a non-empty secret. A public space keeps
    /// whatever secret was supplied (or none); it is never consulted.
    pub fn new(is_public: bool, secret: Option<&str>) -> Result<Self> {
        let secret = secret.filter(|s| !s.is_empty());
        if !is_public && secret.is_none() {
            return Err(CodespaceError::Validation(
                "A private codespace requires a passcode".to_string(),
            ));
        }
        Ok(Self {
            is_public,
            secret_hash: secret.map(access::hash_secret),
        })
    }
}

/// Derive a language tag from a file name: the text after the last `.`.
pub fn language_for(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => PLAINTEXT_LANGUAGE.to_string(),
    }
}

/// Normalize a file name typed by a user before asking the server to create it.
///
/// Names without an extension get `.txt` appended.
pub fn normalize_new_file_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CodespaceError::missing("fileName"));
    }
    if name.contains('.') {
        Ok(name.to_string())
    } else {
        Ok(format!("{}.txt", name))
    }
}

/// Validate a space name used as a routing key.
pub fn validate_space_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        Err(CodespaceError::Validation(
            "Codespace name is required".to_string(),
        ))
    } else {
        Ok(name)
    }
}
