//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the I/O boundary traits and wires up the
//! dependencies handed to the dispatcher.

pub mod di;
pub mod error;
pub mod traits;

pub use error::{TransportError, TransportResult};
