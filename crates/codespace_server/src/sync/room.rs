use codespace_core::ServerEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::ClientConnection;

/// Identity of one live realtime connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statistics about the room registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub active_connections: usize,
    pub active_rooms: usize,
}

/// A registered connection: its outbound queue and the room it joined, if any
struct Member {
    tx: mpsc::UnboundedSender<ServerEvent>,
    room: Option<String>,
}

/// The set of connections currently associated with one space name
#[derive(Default)]
struct SpaceRoom {
    /// Members in join order
    members: Vec<ConnectionId>,
}

#[derive(Default)]
struct Registry {
    members: HashMap<ConnectionId, Member>,
    rooms: HashMap<String, SpaceRoom>,
}

/// Process-scoped registry of rooms keyed by space name.
///
/// Created once at server start and shared by `Arc`. Each connection owns an
/// unbounded in-order queue, so members observe the events of one sender in the
/// order that sender emitted them. Nothing is retained for late joiners.
#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Registry>,
}

impl RoomRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new connection with its own outbound queue. It joins no room yet.
    pub fn register(self: &Arc<Self>) -> ClientConnection {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.write()
            .members
            .insert(id.clone(), Member { tx, room: None });
        debug!("Registered connection {}", id);
        ClientConnection::new(id, rx, Arc::clone(self))
    }

    /// Add a connection to a space's room, leaving any room it was in.
    ///
    /// Returns false if the connection is not registered.
    pub fn join(&self, id: &ConnectionId, space_name: &str) -> bool {
        let mut registry = self.write();
        let previous = match registry.members.get_mut(id) {
            Some(member) => member.room.replace(space_name.to_string()),
            None => return false,
        };

        if let Some(previous) = previous {
            if previous == space_name {
                return true;
            }
            remove_from_room(&mut registry, &previous, id);
        }

        let room = registry.rooms.entry(space_name.to_string()).or_insert_with(|| {
            info!("Created room for codespace: {}", space_name);
            SpaceRoom::default()
        });
        room.members.push(id.clone());
        true
    }

    /// Remove a connection from its room and drop its queue
    pub fn leave(&self, id: &ConnectionId) {
        let mut registry = self.write();
        if let Some(member) = registry.members.remove(id) {
            if let Some(room) = member.room {
                remove_from_room(&mut registry, &room, id);
            }
            debug!("Connection {} left", id);
        }
    }

    /// Deliver an event to every member of a room, except `exclude` when given.
    ///
    /// Returns the number of members the event was queued for. An empty or
    /// unknown room is not an error.
    pub fn broadcast(
        &self,
        space_name: &str,
        event: &ServerEvent,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let registry = self.read();
        let Some(room) = registry.rooms.get(space_name) else {
            return 0;
        };

        let mut delivered = 0;
        for id in room.members.iter().filter(|id| Some(*id) != exclude) {
            if let Some(member) = registry.members.get(id) {
                if member.tx.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    debug!("Dropping event for closed connection {}", id);
                }
            }
        }
        delivered
    }

    /// Deliver an event to a single connection
    pub fn send_to(&self, id: &ConnectionId, event: ServerEvent) -> bool {
        self.read()
            .members
            .get(id)
            .is_some_and(|member| member.tx.send(event).is_ok())
    }

    /// Members of a room, in join order
    pub fn members_of(&self, space_name: &str) -> Vec<ConnectionId> {
        self.read()
            .rooms
            .get(space_name)
            .map(|room| room.members.clone())
            .unwrap_or_default()
    }

    /// The room a connection has joined, if any
    pub fn room_of(&self, id: &ConnectionId) -> Option<String> {
        self.read().members.get(id).and_then(|m| m.room.clone())
    }

    /// Get statistics about connections and rooms
    pub fn stats(&self) -> RoomStats {
        let registry = self.read();
        RoomStats {
            active_connections: registry.members.len(),
            active_rooms: registry.rooms.len(),
        }
    }
}

fn remove_from_room(registry: &mut Registry, space_name: &str, id: &ConnectionId) {
    if let Some(room) = registry.rooms.get_mut(space_name) {
        room.members.retain(|member| member != id);
        if room.members.is_empty() {
            registry.rooms.remove(space_name);
            info!("Removed idle room: {}", space_name);
        }
    }
}
