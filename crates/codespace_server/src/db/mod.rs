mod repo;
mod schema;
mod store;

pub use repo::{SpaceInfo, SpaceRepo};
pub use schema::init_database;
pub use store::SpaceStore;
