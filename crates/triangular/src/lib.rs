pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod opportunities;
pub mod quotes;
pub mod reputation;
pub mod store;
pub mod telemetry;
pub mod tiers;
pub mod users;
