//! Promethium command-line interface.
//!
//! Argument definitions live in [`cli`]; each subcommand group maps onto
//! the matching resource client in [`commands`].

pub mod cli;
pub mod commands;
