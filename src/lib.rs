//! This is the library of the Bamboo webhook relay.
pub mod bamboo;
pub mod config;
pub mod github;
pub mod relay;
pub mod utils;

pub use bamboo::{BambooClient, BambooCredentials, BambooDispatcher, DryRunDispatcher};
pub use config::RelayConfig;
pub use github::server::{create_app, ServerState};
pub use github::WebhookSecret;
pub use relay::Relay;

#[cfg(test)]
mod tests;
