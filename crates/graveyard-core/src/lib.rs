//! Graveyard Core - Ledger types, domain events, configuration and error handling

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::GraveyardConfig;
pub use error::{Error, ErrorKind, Result};
pub use events::*;
pub use types::*;
