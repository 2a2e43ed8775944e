//! Template acquisition and rendering
//!
//! This module provides:
//! - The two-tier transport to the template repository (contents API with
//!   raw-endpoint fallback)
//! - Recursive materialization of a template's file tree onto local disk
//! - The in-place variable renderer applied after materialization

pub mod fetcher;
pub mod renderer;
pub mod transport;

pub use fetcher::materialize;
pub use renderer::{render_tree, TEMPLATE_SUFFIX};
pub use transport::{EntryKind, Transport, TreeEntry};
