//! Client-side mirror of a space.
//!
//! A [`ClientReplica`] holds the file list as of the last snapshot or event,
//! the open tabs and the active file. Local actions and peer events go through
//! the same removal path so every replica picks the same next active tab.

use log::debug;

use crate::error::{CodespaceError, Result};
use crate::protocol::{ClientEvent, ServerEvent, SpaceData};
use crate::space::SpaceFile;

/// What an applied event changed, for display purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaChange {
    /// Content of a file was replaced
    ContentUpdated { file: String },
    /// The file list was replaced by the server's authoritative list
    FilesReplaced { added: Vec<String> },
    /// A file was removed; `active` is the active file afterwards
    FileRemoved {
        file: String,
        active: Option<String>,
    },
    PrivacyUpdated { is_public: bool },
    /// A peer closed a tab (advisory only)
    PeerClosed { file: String },
    PeerJoined { id: String },
    TerminalOutput { text: String },
    Error { message: String },
    /// The event referred to something this replica does not hold
    Ignored,
}

/// Local mirror of one space's files and tab state.
#[derive(Debug, Clone)]
pub struct ClientReplica {
    space_name: String,
    is_public: bool,
    has_secret: bool,
    files: Vec<SpaceFile>,
    open: Vec<String>,
    active: Option<String>,
}

impl ClientReplica {
    /// Build a replica from a bootstrap snapshot. The first file is opened and active.
    pub fn from_snapshot(snapshot: SpaceData) -> Self {
        let mut replica = Self {
            space_name: snapshot.name.clone(),
            is_public: snapshot.is_public,
            has_secret: snapshot.has_secret,
            files: Vec::new(),
            open: Vec::new(),
            active: None,
        };
        replica.reconcile(snapshot);
        replica
    }

    /// Replace local state with a fresh snapshot. Open tabs reset to the first file.
    pub fn reconcile(&mut self, snapshot: SpaceData) {
        self.is_public = snapshot.is_public;
        self.has_secret = snapshot.has_secret;
        self.files = snapshot.files;
        self.open.clear();
        self.active = None;
        if let Some(first) = self.files.first() {
            self.open.push(first.name.clone());
            self.active = Some(first.name.clone());
        }
    }

    pub fn space_name(&self) -> &str {
        &self.space_name
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn has_secret(&self) -> bool {
        self.has_secret
    }

    pub fn files(&self) -> &[SpaceFile] {
        &self.files
    }

    pub fn open_tabs(&self) -> &[String] {
        &self.open
    }

    pub fn active(&self) -> Option<&SpaceFile> {
        self.active.as_deref().and_then(|name| self.file(name))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn file(&self, name: &str) -> Option<&SpaceFile> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Open a file in a tab (if not already open) and make it active.
    pub fn open(&mut self, name: &str) -> Result<()> {
        if self.file(name).is_none() {
            return Err(CodespaceError::FileNotFound {
                space: self.space_name.clone(),
                file: name.to_string(),
            });
        }
        if !self.open.iter().any(|n| n == name) {
            self.open.push(name.to_string());
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Close a tab. Returns the advisory event to relay to peers.
    pub fn close(&mut self, name: &str) -> Option<ClientEvent> {
        if !self.open.iter().any(|n| n == name) {
            return None;
        }
        self.close_tab(name);
        Some(ClientEvent::FileClose {
            space_name: self.space_name.clone(),
            file_name: name.to_string(),
        })
    }

    /// Replace the content of the active file. Returns the edit to send to the room.
    pub fn edit_active(&mut self, content: impl Into<String>) -> Option<ClientEvent> {
        let name = self.active.clone()?;
        let content = content.into();
        let file = self.files.iter_mut().find(|f| f.name == name)?;
        file.content = content.clone();
        Some(ClientEvent::CodeChange {
            space_name: self.space_name.clone(),
            file: name,
            content,
        })
    }

    /// Remove a file locally (self-initiated deletion).
    ///
    /// Uses the same tie-break as a peer's `file-deleted`.
    pub fn remove_file(&mut self, name: &str) -> Option<String> {
        self.files.retain(|f| f.name != name);
        self.close_tab(name);
        self.active.clone()
    }

    /// Apply an event received from the server.
    pub fn apply(&mut self, event: ServerEvent) -> ReplicaChange {
        match event {
            ServerEvent::CodeUpdated { file, content } => {
                match self.files.iter_mut().find(|f| f.name == file) {
                    Some(target) => {
                        target.content = content;
                        ReplicaChange::ContentUpdated { file }
                    }
                    None => {
                        debug!("Ignoring update for unknown file {}", file);
                        ReplicaChange::Ignored
                    }
                }
            }
            ServerEvent::FileCreated { files } => {
                let added = files
                    .iter()
                    .filter(|f| self.file(&f.name).is_none())
                    .map(|f| f.name.clone())
                    .collect();
                self.replace_files(files);
                ReplicaChange::FilesReplaced { added }
            }
            ServerEvent::FileDeleted { file_name, files } => {
                self.replace_files(files);
                // The authoritative list no longer has it; make sure the tab goes too
                self.close_tab(&file_name);
                ReplicaChange::FileRemoved {
                    file: file_name,
                    active: self.active.clone(),
                }
            }
            ServerEvent::PrivacyUpdated {
                is_public,
                has_secret,
            } => {
                self.is_public = is_public;
                self.has_secret = has_secret;
                ReplicaChange::PrivacyUpdated { is_public }
            }
            ServerEvent::FileClosed { file_name } => ReplicaChange::PeerClosed { file: file_name },
            ServerEvent::UserJoined { id } => ReplicaChange::PeerJoined { id },
            ServerEvent::TerminalOutput { text } => ReplicaChange::TerminalOutput { text },
            ServerEvent::Error { message, .. } => ReplicaChange::Error { message },
        }
    }

    /// Swap in a new file list and drop tabs for files that no longer exist.
    fn replace_files(&mut self, files: Vec<SpaceFile>) {
        self.files = files;
        let stale: Vec<String> = self
            .open
            .iter()
            .filter(|name| self.file(name).is_none())
            .cloned()
            .collect();
        for name in stale {
            self.close_tab(&name);
        }
        if let Some(active) = &self.active {
            if self.file(active).is_none() {
                self.active = self.open.first().cloned();
            }
        }
    }

    /// Remove a tab; if it was active, the preceding tab (else the first) becomes active.
    fn close_tab(&mut self, name: &str) {
        let Some(index) = self.open.iter().position(|n| n == name) else {
            if self.active.as_deref() == Some(name) {
                self.active = self.open.first().cloned();
            }
            return;
        };
        self.open.remove(index);

        if self.active.as_deref() == Some(name) {
            self.active = if index > 0 {
                self.open.get(index - 1).cloned()
            } else {
                self.open.first().cloned()
            };
        }
    }
}
