//! CLI command implementations.

pub mod accounts;
pub mod run;
pub mod settings;
