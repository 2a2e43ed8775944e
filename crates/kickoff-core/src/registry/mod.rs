//! Template registry: catalog cache and per-template configuration.

pub mod catalog;
pub mod config;

pub use catalog::{Catalog, Template, TemplateBody, TemplateVariables};
pub use config::{PromptKind, PromptSpec, TemplateConfig};
