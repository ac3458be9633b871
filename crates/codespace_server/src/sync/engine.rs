use codespace_core::access::{can_read, is_passcode_correct};
use codespace_core::{
    ClientEvent, CodespaceError, PrivacyState, PrivacyUpdate, Result, ServerEvent, Space,
    SpaceFile,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{ConnectionId, RoomRegistry};
use crate::db::SpaceStore;
use crate::terminal::CommandRunner;

/// Routes client events to room broadcasts and store writes.
///
/// Broadcast and persistence are separate steps: a broadcast never waits on the
/// store, and a failed write after a broadcast is logged, not undone.
#[derive(Clone)]
pub struct SyncEngine {
    registry: Arc<RoomRegistry>,
    store: Arc<dyn SpaceStore>,
    runner: Arc<CommandRunner>,
}

impl SyncEngine {
    pub fn new(
        registry: Arc<RoomRegistry>,
        store: Arc<dyn SpaceStore>,
        runner: CommandRunner,
    ) -> Self {
        Self {
            registry,
            store,
            runner: Arc::new(runner),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn SpaceStore> {
        &self.store
    }

    /// Handle one text frame from a connection.
    ///
    /// Malformed frames are answered with a validation error to the sender.
    pub async fn handle_frame(&self, conn: &ConnectionId, text: &str) {
        match ClientEvent::parse(text) {
            Ok(event) => self.handle(conn, event).await,
            Err(e) => {
                debug!("Rejected frame from {}: {}", conn, e);
                self.registry.send_to(conn, ServerEvent::from(&e));
            }
        }
    }

    /// Handle a parsed event. Failures go to the sender only, as an `error` event.
    pub async fn handle(&self, conn: &ConnectionId, event: ClientEvent) {
        let name = event.name();
        if let Err(e) = self.dispatch(conn, event).await {
            warn!("{} from {} failed: {}", name, conn, e);
            self.registry.send_to(conn, ServerEvent::from(&e));
        }
    }

    async fn dispatch(&self, conn: &ConnectionId, event: ClientEvent) -> Result<()> {
        if let ClientEvent::JoinSpace {
            space_name,
            passcode,
        } = event
        {
            return self.join(conn, &space_name, passcode.as_deref()).await;
        }

        self.ensure_joined(conn, event.space_name())?;

        match event {
            ClientEvent::CodeChange {
                space_name,
                file,
                content,
            } => {
                self.relay_code_change(conn, &space_name, &file, &content);
                self.persist_content(space_name, file, content);
                Ok(())
            }
            ClientEvent::CreateFile {
                space_name,
                file_name,
                language,
            } => self
                .create_file(&space_name, &file_name, language.as_deref())
                .await
                .map(|_| ()),
            ClientEvent::DeleteFile {
                space_name,
                file_name,
            } => self
                .delete_file(&space_name, &file_name)
                .await
                .map(|_| ()),
            ClientEvent::PrivacyChange { space_name, .. } => {
                // Peers get the stored flags, not the sender's claim
                let privacy = self.load(&space_name).await?.privacy();
                let event = ServerEvent::PrivacyUpdated {
                    is_public: privacy.is_public,
                    has_secret: privacy.has_secret,
                };
                self.registry.broadcast(&space_name, &event, Some(conn));
                Ok(())
            }
            ClientEvent::FileClose {
                space_name,
                file_name,
            } => {
                let event = ServerEvent::FileClosed { file_name };
                self.registry.broadcast(&space_name, &event, Some(conn));
                Ok(())
            }
            ClientEvent::TerminalCommand { command, .. } => self.run_command(conn, &command),
            ClientEvent::JoinSpace { .. } => Ok(()),
        }
    }

    async fn load(&self, space_name: &str) -> Result<Space> {
        self.store
            .get_by_name(space_name)
            .await?
            .ok_or_else(|| CodespaceError::SpaceNotFound(space_name.to_string()))
    }

    /// Re-apply the access gate and add the connection to the space's room
    async fn join(&self, conn: &ConnectionId, space_name: &str, passcode: Option<&str>) -> Result<()> {
        let space = self.load(space_name).await?;

        if !can_read(&space, passcode) {
            return Err(CodespaceError::Unauthorized);
        }

        if !self.registry.join(conn, space_name) {
            // The transport closed while the store lookup was in flight
            debug!("Connection {} went away before joining {}", conn, space_name);
            return Ok(());
        }
        info!("Connection {} joined codespace {}", conn, space_name);

        let event = ServerEvent::UserJoined {
            id: conn.to_string(),
        };
        self.registry.broadcast(space_name, &event, Some(conn));
        Ok(())
    }

    fn ensure_joined(&self, conn: &ConnectionId, space_name: &str) -> Result<()> {
        match self.registry.room_of(conn) {
            Some(room) if room == space_name => Ok(()),
            _ => Err(CodespaceError::NotJoined(space_name.to_string())),
        }
    }

    /// Send an edit to the other members of the room
    pub fn relay_code_change(&self, conn: &ConnectionId, space_name: &str, file: &str, content: &str) {
        let event = ServerEvent::CodeUpdated {
            file: file.to_string(),
            content: content.to_string(),
        };
        self.registry.broadcast(space_name, &event, Some(conn));
    }

    /// Write file content in the background. Failures are logged and never surfaced.
    pub fn persist_content(&self, space_name: String, file: String, content: String) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.update_file_content(&space_name, &file, &content).await {
                let failure = CodespaceError::StoreWrite {
                    space: space_name,
                    file,
                    reason: e.to_string(),
                };
                error!("{}", failure);
            }
        })
    }

    /// Append a file and send the authoritative list to every member, sender included.
    pub async fn create_file(
        &self,
        space_name: &str,
        file_name: &str,
        language: Option<&str>,
    ) -> Result<Space> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(CodespaceError::missing("fileName"));
        }
        let file = SpaceFile::new(file_name, language);
        let space = self.store.append_file(space_name, file).await?;
        info!("Created file in codespace {}", space_name);

        let event = ServerEvent::FileCreated {
            files: space.files.clone(),
        };
        self.registry.broadcast(space_name, &event, None);
        Ok(space)
    }

    /// Remove a file and send the resulting list to every member.
    ///
    /// Removing a name that is not present still succeeds and still broadcasts.
    pub async fn delete_file(&self, space_name: &str, file_name: &str) -> Result<Space> {
        let space = self.store.remove_file(space_name, file_name).await?;
        info!("Deleted file {} from codespace {}", file_name, space_name);

        let event = ServerEvent::FileDeleted {
            file_name: file_name.to_string(),
            files: space.files.clone(),
        };
        self.registry.broadcast(space_name, &event, None);
        Ok(space)
    }

    /// Change a space's privacy and send the stored flags to every member.
    ///
    /// A private space only changes hands with its current passcode.
    pub async fn update_privacy(
        &self,
        space_name: &str,
        current_passcode: Option<&str>,
        update: PrivacyUpdate,
    ) -> Result<PrivacyState> {
        let space = self.load(space_name).await?;
        if !space.is_public && !is_passcode_correct(&space, current_passcode) {
            return Err(CodespaceError::Unauthorized);
        }

        let privacy = self.store.set_privacy(space_name, update).await?;
        info!(
            "Codespace {} is now {}",
            space_name,
            if privacy.is_public { "public" } else { "private" }
        );

        let event = ServerEvent::PrivacyUpdated {
            is_public: privacy.is_public,
            has_secret: privacy.has_secret,
        };
        self.registry.broadcast(space_name, &event, None);
        Ok(privacy)
    }

    /// Start an allow-listed command whose output streams back to `conn` only
    fn run_command(&self, conn: &ConnectionId, command: &str) -> Result<()> {
        let prepared = self.runner.prepare(command)?;
        let registry = Arc::clone(&self.registry);
        let conn = conn.clone();

        tokio::spawn(prepared.run(move |text| {
            registry.send_to(&conn, ServerEvent::TerminalOutput { text });
        }));
        Ok(())
    }
}
