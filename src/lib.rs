pub mod bridge;
pub mod config;
pub mod error;
pub mod params;
pub mod preferences;
pub mod registry;
pub mod rpc;
pub mod store;
