//! Core types for weave.

pub mod message;
pub mod parameters;
pub mod stream;

pub use message::*;
pub use parameters::*;
pub use stream::*;
