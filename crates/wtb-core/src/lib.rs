//! Protocol and session layer of the wallet tracker bot.
//!
//! Everything here is transport-agnostic: Telegram lives in `wtb-telegram`,
//! the tracking backend behind [`ports::TrackingService`].

pub mod auth;
pub mod callback;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod inbound;
pub mod keyboards;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod render;
pub mod session_queue;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
