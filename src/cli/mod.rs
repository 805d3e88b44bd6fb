//! Command-line interface
//!
//! Argument definitions and command handlers for the `revealgate` binary.

pub mod args;
pub mod commands;
