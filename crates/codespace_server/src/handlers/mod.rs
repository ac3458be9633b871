pub mod api;
pub mod ws;

pub use api::{ApiState, api_routes};
pub use ws::{WsState, ws_handler};
