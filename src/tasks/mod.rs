//! # Async task lifecycle tracking.
//!
//! - [`TaskStatus`] / [`TaskSnapshot`] / [`TaskRecord`]: the data model
//! - [`TaskRegistry`]: monotonic, idempotent store fed by the task stream
//! - [`RegistryChange`]: mutation notices for views watching the registry

mod model;
mod registry;

pub use model::{TaskRecord, TaskSnapshot, TaskStatus};
pub use registry::{Applied, ChangeKind, IgnoreReason, RegistryChange, TaskRegistry};
