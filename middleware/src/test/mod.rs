//! Unit test module
//!
//! Middleware unit tests live here, separate from source files.
//! Tests interact with handlers via public and pub(crate) APIs.

mod gated_handler_test;
