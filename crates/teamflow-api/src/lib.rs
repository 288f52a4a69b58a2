//! REST client for the TeamFlow server.

pub mod client;
pub mod dto;

pub use client::RestDirectory;
