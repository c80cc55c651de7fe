//! Glue between the command line and the library crates.

pub(crate) mod args;
pub(crate) mod cache_manager;
