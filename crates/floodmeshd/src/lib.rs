//! floodmeshd: the overlay node and its daemon.
//!
//! The binary in `main.rs` is a thin wrapper around [`Node`]; the library
//! exists so several nodes can run in one process under test.

mod admission;
pub mod error;
pub mod events;
mod flood;
pub mod node;
mod session;

pub use error::OverlayError;
pub use events::DaemonEvents;
pub use node::Node;
