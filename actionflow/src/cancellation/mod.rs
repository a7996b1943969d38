//! Cooperative cancellation and run timeouts.
//!
//! This module provides:
//! - CancellationToken, checked before each operation starts
//! - TimeoutController, which cancels the token when a run overstays

mod timeout;
mod token;

pub use timeout::{TimeoutController, TIMEOUT_REASON};
pub use token::CancellationToken;
