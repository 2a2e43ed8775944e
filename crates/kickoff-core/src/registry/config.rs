//! Per-template configuration: ordered prompt specifications, conditional
//! follow-ups, and template-provided generated values.
//!
//! Fetched lazily from `<key>/template.json` on every invocation - unlike
//! the catalog, this document is never cached to disk.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Template configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    #[serde(default)]
    pub name: String,

    /// Ordered question specs presented before generation.
    #[serde(default)]
    pub prompts: Vec<PromptSpec>,

    /// Follow-up prompts keyed by the answer name that triggers them.
    #[serde(default)]
    pub conditional_prompts: BTreeMap<String, Vec<PromptSpec>>,

    /// Values merged into the mapping without prompting.
    #[serde(default)]
    pub generated_vars: BTreeMap<String, Value>,
}

/// One question presented to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Input,
    Password,
    Confirm,
    List,
    Number,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config_document() {
        let json = serde_json::json!({
            "name": "Next.js + NextAuth + PostgreSQL",
            "prompts": [
                { "type": "password", "name": "nextauthSecret",
                  "message": "NextAuth Secret (leave empty to auto-generate):", "default": "" },
                { "type": "confirm", "name": "enableGoogleAuth",
                  "message": "Enable Google OAuth?", "default": false }
            ],
            "conditionalPrompts": {
                "enableGoogleAuth": [
                    { "type": "input", "name": "googleClientId", "message": "Google Client ID:" }
                ]
            },
            "generatedVars": { "nextauthUrl": "http://localhost:3000" }
        });

        let config: TemplateConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.prompts.len(), 2);
        assert_eq!(config.prompts[0].kind, PromptKind::Password);
        assert_eq!(config.prompts[1].kind, PromptKind::Confirm);
        assert_eq!(config.conditional_prompts["enableGoogleAuth"].len(), 1);
        assert_eq!(
            config.generated_vars["nextauthUrl"],
            serde_json::json!("http://localhost:3000")
        );
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let config: TemplateConfig =
            serde_json::from_value(serde_json::json!({ "name": "minimal" })).unwrap();
        assert!(config.prompts.is_empty());
        assert!(config.conditional_prompts.is_empty());
        assert!(config.generated_vars.is_empty());
    }
}
