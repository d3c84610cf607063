//! Shared utilities.

pub mod bootstrap;
pub mod cancel;
