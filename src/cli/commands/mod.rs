//! Command handlers.
//!
//! Each module owns one subcommand.

pub mod clean_command;
pub mod config_command;
pub mod preview_command;
