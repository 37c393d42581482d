//! Core domain + application logic for the fal.ai image bot.
//!
//! This crate is framework-agnostic. Telegram and fal.ai live behind ports (traits)
//! implemented in adapter crates.

pub mod bot;
pub mod commands;
pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod generation;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod retry;
pub mod settings;
pub mod trigger;

pub use errors::{Error, Result};
