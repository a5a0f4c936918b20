pub mod error;
pub mod types;
pub mod config;
pub mod util;
pub mod store;
pub mod provider;
pub mod search;
pub mod channel;
pub mod handler;
pub mod router;
pub mod service;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const LOGO: &str = "🤖";
