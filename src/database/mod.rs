pub mod assignments;
pub mod availabilities;
pub mod certifications;
pub mod connection;
pub mod games;
pub mod models;
pub mod payments;
pub mod reviews;
pub mod setup;
pub mod users;

pub use connection::{create_pool, get_connection, DbConn, DbPool};
pub use models::*;
