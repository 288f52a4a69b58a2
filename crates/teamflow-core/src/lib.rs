//! Domain layer of the TeamFlow terminal client.
//!
//! Defines the session store, entity model, command grammar, navigation
//! state machine, and the trait seams (`Directory`, `ChatConnector`,
//! `Console`) that the transport crates implement.

pub mod chat;
pub mod command;
pub mod config;
pub mod console;
pub mod directory;
pub mod entity;
pub mod error;
pub mod nav;
pub mod session;

// Re-export common error type
pub use error::{Result, TeamFlowError};
