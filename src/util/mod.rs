//! Utility modules: deadlines and cancellation.

pub mod timeout;
