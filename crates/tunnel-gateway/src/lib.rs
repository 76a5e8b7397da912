//! HTTP transport of the Tunnel URL shortener.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod session;
pub mod state;

pub use app::App;
pub use state::AppState;
