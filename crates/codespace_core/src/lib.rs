//! Core library for Codespace.
//!
//! Shared between the sync server and clients: the space model, the access
//! gate, the realtime wire protocol and the client-side replica.

/// Access gate (passcode checks)
pub mod access;

/// Error (common error types)
pub mod error;

/// Realtime events and HTTP bodies
pub mod protocol;

/// Client-side mirror of a space
pub mod replica;

/// Spaces and files
pub mod space;

pub use error::{CodespaceError, ErrorKind, Result};
pub use protocol::{ClientEvent, ServerEvent, SpaceData};
pub use replica::{ClientReplica, ReplicaChange};
pub use space::{PrivacyState, PrivacyUpdate, Space, SpaceFile, SpaceStatus};
