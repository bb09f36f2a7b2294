// Core infrastructure modules
pub mod core {
    pub mod config;
    pub mod errors;
}

// Static flows: declare, accumulate, compile once, run many times
pub mod flow;

// Re-exports for convenience
pub use crate::core::config::{DuplicatePolicy, FlowConfig, FlowOverrides, FlowSettings};
pub use crate::core::errors::{FlowError, Result};
pub use flow::*;

// Attribute macro for link-time contributions
pub use flowseq_macros::action;

#[doc(hidden)]
pub use linkme;
