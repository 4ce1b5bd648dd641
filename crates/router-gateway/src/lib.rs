//! Library half of the gateway binary, split out so integration tests can
//! assemble the same `AppState`/`Server` the binary does, grounded on the
//! teacher's `synapse-server` (library) / `synapse` (thin binary) split.

pub mod args;
pub mod handlers;
pub mod secret_store;
pub mod server;
pub mod stores;
