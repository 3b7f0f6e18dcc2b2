pub mod calculations;
pub mod gateway;
pub mod models;

pub use gateway::{DocumentRenderer, EstimateGateway, GatewayError};
pub use models::*;
