//! # middleware
//!
//! Cross-cutting handlers for the tenant chain: [`LoggingHandler`] logs every update and its
//! outcome; [`GatedHandler`] runs another handler behind a [`ratelimit::FairQueue`].

mod gate;
mod logging;

pub use gate::{GatedHandler, KeyFn};
pub use logging::LoggingHandler;

#[cfg(test)]
mod test;
