mod connection;
mod engine;
mod room;

pub use connection::ClientConnection;
pub use engine::SyncEngine;
pub use room::{ConnectionId, RoomRegistry, RoomStats};
