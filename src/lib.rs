pub(crate) mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod normalize;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod settings;
pub mod state;
pub mod stream;
pub mod transport;
