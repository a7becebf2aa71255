//! Core domain + application logic for the avio operator bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and PostgreSQL
//! live behind ports (traits) implemented in adapter crates.

pub mod audit;
pub mod broadcast;
pub mod config;
pub mod delivery;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod export;
pub mod formatting;
pub mod locale;
pub mod logging;
pub mod messaging;
pub mod phone;
pub mod registration;
pub mod series;
pub mod tasks;
pub mod totals;

#[cfg(test)]
pub(crate) mod testutil;

pub use errors::{Error, Result};
