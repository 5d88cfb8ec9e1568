// Domain module - Configuration, errors and wire protocol
pub mod config;
pub mod error;
pub mod protocol;
