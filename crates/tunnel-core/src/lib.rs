//! Core types and traits for the Tunnel URL shortener.
//!
//! This crate provides the record model, the storage error taxonomy and
//! the storage port that every backend in `tunnel-storage` implements.

pub mod error;
pub mod model;
pub mod repository;
pub mod shortcode;

pub use error::{Result, StorageError};
pub use model::{NewUrl, Url, UrlId, User, UserId};
pub use repository::{Store, UrlRepository, UserRepository};
pub use shortcode::ShortCode;
