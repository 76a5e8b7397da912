//! Storage backends for the Tunnel URL shortener.
//!
//! Every backend implements [`tunnel_core::Store`]; callers pick one at
//! startup and only ever talk to it through the repository traits.

pub mod file;
pub mod memory;
pub mod mysql;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
