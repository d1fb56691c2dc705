use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use crate::{ArchiveError, Result, archive_name};

/// One entry to archive, produced by traversal and consumed once.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntryPlan {
    /// Where to read the entry from.
    pub path: PathBuf,
    /// Archive name, `/`-separated; directories end with `/`.
    pub name: String,
    /// Payload size in bytes (0 for directories).
    pub size: u64,
    pub is_dir: bool,
    pub modified: SystemTime,
    /// Unix permission bits.
    pub mode: u32,
}

/// Totals from the scan phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: u64,
    pub directories: u64,
    pub total_bytes: u64,
}

/// Lazy, deterministic traversal of one source root.
///
/// Directories come before their descendants and siblings are sorted by
/// file name, so two walks over an unchanged tree yield identical plans.
/// A directory root contributes its contents only; a file root becomes a
/// single entry named after itself. Symlinks and special files are skipped.
pub struct EntryPlanner {
    base: PathBuf,
    walker: walkdir::IntoIter,
}

impl EntryPlanner {
    pub fn new(root: &Path) -> Result<Self> {
        let meta = std::fs::metadata(root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ArchiveError::SourceNotFound(root.to_path_buf())
            } else {
                ArchiveError::Read {
                    path: root.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let base = if meta.is_dir() {
            root.to_path_buf()
        } else {
            root.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Ok(Self { base, walker })
    }

    fn plan(&self, path: &Path, meta: &Metadata) -> Result<ArchiveEntryPlan> {
        let is_dir = meta.is_dir();
        Ok(ArchiveEntryPlan {
            path: path.to_path_buf(),
            name: archive_name(&self.base, path, is_dir)?,
            size: if is_dir { 0 } else { meta.len() },
            is_dir,
            modified: meta.modified().unwrap_or(UNIX_EPOCH),
            mode: mode_of(meta),
        })
    }
}

impl Iterator for EntryPlanner {
    type Item = Result<ArchiveEntryPlan>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            let file_type = entry.file_type();
            if entry.depth() == 0 && file_type.is_dir() {
                continue;
            }
            if !file_type.is_dir() && !file_type.is_file() {
                tracing::warn!(path = %entry.path().display(), "skipping symlink or special file");
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => return Some(Err(e.into())),
            };
            return Some(self.plan(entry.path(), &meta));
        }
    }
}

/// Walks every root once and totals files, directories and bytes.
///
/// Fails on the first unreadable path.
pub fn scan(roots: &[PathBuf]) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();
    for root in roots {
        for plan in EntryPlanner::new(root)? {
            let plan = plan?;
            if plan.is_dir {
                summary.directories += 1;
            } else {
                summary.files += 1;
                summary.total_bytes += plan.size;
            }
        }
    }
    Ok(summary)
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/inner")).unwrap();
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("b/inner/z.txt"), b"zz").unwrap();
        std::fs::write(root.join("b/y.txt"), b"yyy").unwrap();
        std::fs::write(root.join("a/x.txt"), b"x").unwrap();
        std::fs::write(root.join("top.bin"), b"").unwrap();
        dir
    }

    fn names(root: &Path) -> Vec<String> {
        EntryPlanner::new(root)
            .unwrap()
            .map(|p| p.unwrap().name)
            .collect()
    }

    #[test]
    fn sorted_parents_first() {
        let dir = tree();
        assert_eq!(
            names(dir.path()),
            vec![
                "a/",
                "a/x.txt",
                "b/",
                "b/inner/",
                "b/inner/z.txt",
                "b/y.txt",
                "empty/",
                "top.bin",
            ]
        );
    }

    #[test]
    fn two_walks_agree() {
        let dir = tree();
        let first: Vec<_> = EntryPlanner::new(dir.path()).unwrap().map(|p| p.unwrap()).collect();
        let second: Vec<_> = EntryPlanner::new(dir.path()).unwrap().map(|p| p.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn scan_totals() {
        let dir = tree();
        let summary = scan(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(
            summary,
            ScanSummary {
                files: 4,
                directories: 4,
                total_bytes: 6,
            }
        );
    }

    #[test]
    fn file_root_uses_basename() {
        let dir = tree();
        let plans: Vec<_> = EntryPlanner::new(&dir.path().join("b/y.txt"))
            .unwrap()
            .map(|p| p.unwrap())
            .collect();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "y.txt");
        assert_eq!(plans[0].size, 3);
        assert!(!plans[0].is_dir);
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = scan(&[dir.path().join("gone")]).unwrap_err();
        assert!(matches!(err, ArchiveError::SourceNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = tree();
        std::os::unix::fs::symlink(dir.path().join("a/x.txt"), dir.path().join("link")).unwrap();
        let all = names(dir.path());
        assert!(!all.iter().any(|n| n.starts_with("link")));
        assert_eq!(scan(&[dir.path().to_path_buf()]).unwrap().files, 4);
    }
}
