//! Core data model for actionflow.
//!
//! - [`Operation`]: a forward action plus an optional compensating action
//! - [`ActionResult`]: the mutable carrier shared across one run

mod operation;
mod result;

pub use operation::{Operation, OperationAction, OperationFuture};
pub use result::{ActionResult, ResultSnapshot};
