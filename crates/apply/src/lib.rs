//! rgo apply: reconcile built manifests against a [`ResourceStore`].

#![forbid(unsafe_code)]

pub mod batch;
pub mod context;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod reconcile;
pub mod render;

pub use batch::{apply_all, delete_all, preview, BatchReport, DeletePolicy};
pub use context::{CancelHandle, ExecContext, APPLY_TIMEOUT, DELETE_TIMEOUT};
pub use reconcile::{apply, delete, Outcome};
pub use render::{render, OutputFormat};
