//! Recursive materialization of a remote template tree.
//!
//! Downloads run depth-first in listing order, one item at a time. A failure
//! anywhere aborts the whole operation and leaves already-written files in
//! place; there is no rollback or resume.

use crate::error::{Error, Result};
use crate::templates::transport::{EntryKind, Transport, TreeEntry};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::fs;

/// Entries never copied out of a template tree: VCS directories, build
/// artifacts, lockfiles, OS cruft.
const SKIP_LIST: &[&str] = &[
    ".git",
    ".svn",
    ".DS_Store",
    "Thumbs.db",
    "node_modules",
    "dist",
    "build",
    ".next",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// True for entries the materializer must not copy.
pub fn should_skip(name: &str) -> bool {
    SKIP_LIST.contains(&name)
}

/// Copy the template's remote tree to `destination`, verbatim bytes, minus
/// skipped entries. Fails with [`Error::TemplateNotFound`] when the template
/// directory does not exist in the repository.
pub async fn materialize(
    transport: &Transport,
    template_key: &str,
    destination: &Path,
) -> Result<()> {
    fs::create_dir_all(destination).await?;

    let entries = match transport.list_dir(template_key).await {
        Ok(entries) => entries,
        Err(Error::NotFound { .. }) => {
            return Err(Error::TemplateNotFound {
                name: template_key.to_string(),
            })
        }
        Err(other) => return Err(other),
    };

    copy_entries(transport, entries, destination).await
}

/// Copy one listing level, recursing into directories via their listing URL.
fn copy_entries<'a>(
    transport: &'a Transport,
    entries: Vec<TreeEntry>,
    destination: &'a Path,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        for entry in entries {
            if should_skip(&entry.name) {
                continue;
            }

            let target = destination.join(&entry.name);
            match entry.kind {
                EntryKind::File => {
                    let url = entry.download_url.as_deref().ok_or_else(|| {
                        Error::Transport {
                            path: entry.name.clone(),
                            reason: "listing entry has no download URL".into(),
                        }
                    })?;
                    let bytes = transport.download(url).await?;
                    fs::write(&target, &bytes).await?;
                }
                EntryKind::Dir => {
                    fs::create_dir_all(&target).await?;
                    let nested = transport.list_url(&entry.url).await?;
                    copy_entries(transport, nested, &target).await?;
                }
                EntryKind::Other => {}
            }
        }
        Ok(())
    })
}
