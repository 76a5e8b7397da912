//! Shared fixtures for the Tunnel test suites.

pub mod error;
pub mod fixtures;
pub mod mysql;

pub use error::{Result, TestInfraError};
