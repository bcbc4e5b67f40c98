//! # roost-core
//!
//! Core types and abstractions for Roost - the unattended game-bot fleet
//! keeper.
//!
//! This crate provides:
//! - Bot status and event types shared across the workspace
//! - The application configuration system
//! - The file-backed operator store (server info, settings, accounts)
//! - The settings schema migrator
//! - Common error types

pub mod config;
pub mod error;
pub mod event;
pub mod settings;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use event::{BotStatus, Event, TimestampedEvent};
pub use settings::{migrate_settings, AntiIdleChat, AntiIdlePhysical, ServerInfo, Settings};
pub use store::{Account, Store};
