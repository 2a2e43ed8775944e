//! In-place rendering of a materialized template tree.
//!
//! Three strategies, dispatched per file:
//! - binary extensions are never opened
//! - `*.hbs` files get full Handlebars evaluation, written with the suffix
//!   stripped, the suffixed source removed afterwards
//! - everything else gets literal `{{name}}` substitution for exact variable
//!   names only
//!
//! The `.hbs` pass is destructive: a second render finds no suffixed files
//! and leaves the tree untouched.

use crate::error::{Error, Result};
use crate::vars::VarMap;
use handlebars::Handlebars;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Reserved suffix marking logic-templated files.
pub const TEMPLATE_SUFFIX: &str = ".hbs";

/// Extensions treated as binary and skipped entirely.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "ico", "svg", "woff", "woff2", "ttf", "eot", "exe", "dll", "so",
    "dylib", "zip", "tar", "gz", "rar",
];

/// Render every regular file under `root` against `variables`, in place.
///
/// Deterministic for a fixed tree and variable mapping: the walk is sorted
/// and both rendering strategies are pure functions of their inputs.
pub fn render_tree(root: &Path, variables: &VarMap) -> Result<()> {
    let registry = Handlebars::new();

    // Collect before processing so freshly written render output is never
    // revisited within the same pass.
    let files: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    for path in files {
        if is_binary(&path) {
            continue;
        }

        if is_template(&path) {
            render_template_file(&registry, &path, variables)?;
        } else {
            substitute_file(&path, variables)?;
        }
    }

    Ok(())
}

fn is_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMPLATE_SUFFIX))
}

/// Evaluate a `.hbs` file, write the result without the suffix, delete the
/// suffixed source.
fn render_template_file(registry: &Handlebars, path: &Path, variables: &VarMap) -> Result<()> {
    let source = fs::read_to_string(path)?;
    let rendered = registry
        .render_template(&source, variables)
        .map_err(|e| Error::Render {
            path: path.to_path_buf(),
            source: e,
        })?;

    let output = strip_suffix(path);
    fs::write(&output, rendered)?;
    fs::remove_file(path)?;
    Ok(())
}

/// Replace `{{key}}` occurrences whose inner name exactly matches a defined
/// variable. Unmatched placeholders stay verbatim. The file is rewritten only
/// when the content actually changed.
fn substitute_file(path: &Path, variables: &VarMap) -> Result<()> {
    // Text files with undeclared binary extensions fail UTF-8 decoding;
    // treat them as binary rather than corrupting them.
    let Ok(content) = fs::read_to_string(path) else {
        return Ok(());
    };

    let mut output = content.clone();
    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        if output.contains(&placeholder) {
            output = output.replace(&placeholder, &value_to_string(value));
        }
    }

    if output != content {
        fs::write(path, output)?;
    }
    Ok(())
}

fn strip_suffix(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stripped = name.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(name);
    path.with_file_name(stripped)
}

/// String form of a variable value: strings verbatim, scalars via display,
/// lists comma-joined, null empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, Value)]) -> VarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_hbs_file_and_removes_source() {
        let temp = TempDir::new().unwrap();
        let hbs = temp.path().join("package.json.hbs");
        fs::write(&hbs, "{\"name\": \"{{projectName}}\"}").unwrap();

        let variables = vars(&[("projectName", json!("demo"))]);
        render_tree(temp.path(), &variables).unwrap();

        let rendered = fs::read_to_string(temp.path().join("package.json")).unwrap();
        assert_eq!(rendered, "{\"name\": \"demo\"}");
        assert!(!hbs.exists());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.hbs"), "{{projectName}}").unwrap();

        let variables = vars(&[("projectName", json!("demo"))]);
        render_tree(temp.path(), &variables).unwrap();
        let after_first = fs::read_to_string(temp.path().join("config")).unwrap();

        render_tree(temp.path(), &variables).unwrap();
        let after_second = fs::read_to_string(temp.path().join("config")).unwrap();
        assert_eq!(after_first, after_second);
        assert!(!temp.path().join("config.hbs").exists());
    }

    #[test]
    fn hbs_conditionals_evaluate() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".env.hbs"),
            "{{#if enableGoogleAuth}}GOOGLE_ID={{googleClientId}}{{/if}}",
        )
        .unwrap();

        let variables = vars(&[
            ("enableGoogleAuth", json!(true)),
            ("googleClientId", json!("abc.googleusercontent.com")),
        ]);
        render_tree(temp.path(), &variables).unwrap();

        let rendered = fs::read_to_string(temp.path().join(".env")).unwrap();
        assert_eq!(rendered, "GOOGLE_ID=abc.googleusercontent.com");
    }

    #[test]
    fn plain_substitution_replaces_known_keys_only() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(".env.example");
        fs::write(&file, "API_URL={{apiBaseUrl}}\nOTHER={{unknownVar}}\n").unwrap();

        let variables = vars(&[("apiBaseUrl", json!("http://x"))]);
        render_tree(temp.path(), &variables).unwrap();

        let content = fs::read_to_string(&file).unwrap();
        assert_eq!(content, "API_URL=http://x\nOTHER={{unknownVar}}\n");
    }

    #[test]
    fn binary_files_are_left_untouched() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("logo.png");
        let payload = b"\x89PNG{{projectName}}\x00\xff";
        fs::write(&file, payload).unwrap();

        let variables = vars(&[("projectName", json!("demo"))]);
        render_tree(temp.path(), &variables).unwrap();

        assert_eq!(fs::read(&file).unwrap(), payload);
    }

    #[test]
    fn non_utf8_content_is_skipped() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("data.bin");
        let payload = b"\xff\xfe{{projectName}}";
        fs::write(&file, payload).unwrap();

        let variables = vars(&[("projectName", json!("demo"))]);
        render_tree(temp.path(), &variables).unwrap();

        assert_eq!(fs::read(&file).unwrap(), payload);
    }

    #[test]
    fn invalid_template_reports_render_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.hbs"), "{{#if unclosed}}").unwrap();

        let variables = vars(&[]);
        let err = render_tree(temp.path(), &variables).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn value_to_string_forms() {
        assert_eq!(value_to_string(&json!("x")), "x");
        assert_eq!(value_to_string(&json!(3001)), "3001");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(["a", "b"])), "a,b");
        assert_eq!(value_to_string(&json!(null)), "");
    }

    #[test]
    fn strip_suffix_only_removes_trailing_marker() {
        assert_eq!(
            strip_suffix(Path::new("/tmp/package.json.hbs")),
            PathBuf::from("/tmp/package.json")
        );
        assert_eq!(
            strip_suffix(Path::new("/tmp/plain.txt")),
            PathBuf::from("/tmp/plain.txt")
        );
    }
}
