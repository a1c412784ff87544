//! # business-bot
//!
//! Process entry for the history watcher: [`cli`] parsing, environment [`config`], and
//! [`bootstrap`] wiring the store, queue store, tenant registry and HTTP server, with metrics
//! exported through [`observability`].

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod observability;

pub use bootstrap::run;
pub use cli::{Cli, Commands};
pub use config::AppConfig;
