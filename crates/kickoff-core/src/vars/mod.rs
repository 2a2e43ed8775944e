//! Variable mapping assembly.
//!
//! The mapping rendered into a project is layered: project basics, user
//! answers, template-provided generated values, conditional answers, then the
//! per-template generator registry. Later layers win on key collisions,
//! except generators, which only fill keys the base left unset.

pub mod generators;

use crate::error::{Error, Result};
use crate::registry::catalog::TemplateBody;
use serde_json::Value;
use std::collections::BTreeMap;

/// Flat variable mapping consumed by the renderer.
pub type VarMap = serde_json::Map<String, Value>;

/// Signature of a generator: a pure function of the base mapping.
pub type GeneratorFn = fn(&VarMap) -> Value;

/// Layer `overlay` on top of `base`; overlay wins on collisions.
pub fn layered(base: &VarMap, overlay: VarMap) -> VarMap {
    let mut out = base.clone();
    for (key, value) in overlay {
        out.insert(key, value);
    }
    out
}

/// A key counts as unset when it is missing, null, or an empty string.
/// Empty strings come from "leave empty to auto-generate" prompts.
pub fn is_unset(map: &VarMap, key: &str) -> bool {
    match map.get(key) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Per-template table of variable generators.
///
/// An explicit value passed by reference - registering a new template does
/// not require touching any central dispatch.
#[derive(Default)]
pub struct GeneratorRegistry {
    by_template: BTreeMap<String, Vec<(String, GeneratorFn)>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the stock template tables.
    pub fn builtin() -> Self {
        use generators::*;

        let mut registry = Self::new();

        registry.register("nextjs-nextauth-postgres", "nextauthSecret", secret_32);
        registry.register("nextjs-nextauth-postgres", "nextauthUrl", localhost_url);
        registry.register("nextjs-nextauth-postgres", "databaseUrl", database_url);

        // nextjs-clerk-supabase: every variable is user-provided.

        registry.register("nestjs-jwt-postgres", "jwtSecret", secret_64);
        registry.register("nestjs-jwt-postgres", "databaseUrl", database_url);
        registry.register("nestjs-jwt-postgres", "apiPort", api_port);
        registry.register("nestjs-jwt-postgres", "apiPrefix", api_prefix);
        registry.register("nestjs-jwt-postgres", "corsOrigins", cors_origins);
        registry.register("nestjs-jwt-postgres", "jwtExpiresIn", jwt_expires_in);

        registry.register("react-vite-tailwind", "apiBaseUrl", api_base_url);

        registry
    }

    /// Register a generator for one variable of one template.
    pub fn register(&mut self, template_key: &str, var_name: &str, generator: GeneratorFn) {
        self.by_template
            .entry(template_key.to_string())
            .or_default()
            .push((var_name.to_string(), generator));
    }

    /// Union of `base` and the applicable generated values. A generator runs
    /// only when `base` leaves its key unset; user input always wins.
    pub fn generate(&self, template_key: &str, base: &VarMap) -> VarMap {
        let mut out = base.clone();

        if let Some(table) = self.by_template.get(template_key) {
            for (name, generator) in table {
                if is_unset(base, name) {
                    out.insert(name.clone(), generator(base));
                }
            }
        }

        out
    }
}

/// Check the descriptor's required variable names once, after generation.
pub fn validate_required(key: &str, descriptor: &TemplateBody, vars: &VarMap) -> Result<()> {
    let missing: Vec<&str> = descriptor
        .variables
        .required
        .iter()
        .filter(|name| is_unset(vars, name))
        .map(|name| name.as_str())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Other(anyhow::anyhow!(
            "template '{}' is missing required variables: {}",
            key,
            missing.join(", ")
        )))
    }
}
