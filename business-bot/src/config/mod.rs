//! Application configuration loaded from the environment.

mod base;


pub use base::AppConfig;
