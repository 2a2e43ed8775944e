//! Kickoff Core - Library for scaffolding projects from remote templates
//!
//! This library implements the template acquisition and rendering pipeline
//! behind the `kickoff` CLI:
//!
//! - **Credential resolution** - environment token, credential file, or
//!   anonymous ([`auth`])
//! - **Catalog cache** - the registry of available templates, cached on disk
//!   with a one-hour TTL ([`registry`])
//! - **Remote tree fetcher** - recursive materialization of a template's
//!   file tree with a two-tier transport fallback ([`templates`])
//! - **Variable generation and rendering** - layered variable mappings,
//!   per-template generators, and the in-place render pass ([`vars`],
//!   [`templates::renderer`])
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based prompt flows
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use kickoff_core::{AuthStore, Catalog, Transport};
//!
//! let transport = Transport::new(AuthStore::new());
//! let catalog = Catalog::new(transport.clone());
//! let templates = catalog.list_templates().await?;
//! ```

pub mod auth;
pub mod error;
pub mod registry;
pub mod templates;
pub mod vars;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use auth::{AuthStore, Credentials};
pub use error::{Error, Result};
pub use registry::{Catalog, Template, TemplateBody, TemplateConfig};
pub use templates::{materialize, render_tree, Transport};
pub use vars::{GeneratorRegistry, VarMap};
