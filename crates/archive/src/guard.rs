use std::path::{Component, Path, PathBuf};

use crate::{ArchiveError, Result};

/// Resolves `path` to an absolute form with symlinks followed as far as
/// the path exists.
///
/// The destination archive usually does not exist yet, so the deepest
/// existing ancestor is canonicalized and the remaining components are
/// appended after lexical `.`/`..` cleanup.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    let resolve_err = |source: std::io::Error| ArchiveError::Resolve {
        path: path.to_path_buf(),
        source,
    };

    let absolute = std::path::absolute(path).map_err(resolve_err)?;
    if let Ok(canonical) = absolute.canonicalize() {
        return Ok(canonical);
    }

    let normalized = normalize(&absolute);
    let mut existing = normalized.as_path();
    let mut rest = Vec::new();
    loop {
        match existing.canonicalize() {
            Ok(mut canonical) => {
                canonical.extend(rest.iter().rev());
                return Ok(canonical);
            }
            Err(e) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    rest.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Err(resolve_err(e)),
            },
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Fails if `destination` would be written inside any of `roots`.
///
/// Both sides are resolved first, and containment is checked per path
/// component so `/data2/out.zip` is not considered inside `/data`.
pub fn check_self_inclusion(destination: &Path, roots: &[PathBuf]) -> Result<()> {
    let destination = resolve_path(destination)?;
    for root in roots {
        let resolved = resolve_path(root)?;
        if destination.starts_with(&resolved) {
            return Err(ArchiveError::SelfInclusion {
                destination,
                root: root.clone(),
            });
        }
    }
    Ok(())
}
