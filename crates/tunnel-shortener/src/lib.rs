//! Domain services of the Tunnel URL shortener.
//!
//! [`ShortenerService`] holds the request-level logic the transport calls
//! into, and [`DeletionPipeline`] runs soft deletes in the background.
//! Both only see storage through [`tunnel_core::Store`].

pub mod deletion;
pub mod error;
pub mod service;

pub use deletion::{DeletionOutcome, DeletionPipeline, DeletionRequest, RetryPolicy};
pub use error::{Result, ShortenerError};
pub use service::{BatchItem, BatchResult, ShortenerService};
