//! Graveyard operator CLI — runs ledger operations against a snapshot file

pub mod cli;

pub use cli::{run, Cli, Command};
