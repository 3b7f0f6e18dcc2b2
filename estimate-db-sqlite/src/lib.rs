//! SQLite implementation of the estimate persistence gateway.

mod decimal;
mod gateway;

pub use gateway::SqliteGateway;
