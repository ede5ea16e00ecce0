pub mod assignments;
pub mod games;
pub mod notifications;
pub mod payments;
pub mod reviews;
pub mod seed;
pub mod server;
pub mod sweep;
