//! Agent loop: the turn state machine and the automatic run driver.

pub mod runner;
pub mod session;
pub mod types;

pub use runner::Agent;
pub use session::AgentSession;
pub use types::*;
