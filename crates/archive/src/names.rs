use std::path::{Component, Path};

use crate::{ArchiveError, Result};

/// Derives the archive name of `path` relative to `base`.
///
/// Components are joined with `/` regardless of platform and directories
/// get a trailing `/`. Rejects:
/// - Paths outside `base`
/// - Parent directory traversal (`..`)
/// - Root or prefix components
/// - Components that are not valid UTF-8
/// - An empty result (the base itself)
pub fn archive_name(base: &Path, path: &Path, is_dir: bool) -> Result<String> {
    let invalid = || ArchiveError::InvalidName(path.to_path_buf());
    let rel = path.strip_prefix(base).map_err(|_| invalid())?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(invalid());
            }
        }
    }
    if parts.is_empty() {
        return Err(invalid());
    }

    let mut name = parts.join("/");
    if is_dir {
        name.push('/');
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_under_base() {
        let name = archive_name(Path::new("/data"), Path::new("/data/a/b.txt"), false).unwrap();
        assert_eq!(name, "a/b.txt");
    }

    #[test]
    fn directory_gets_trailing_slash() {
        let name = archive_name(Path::new("/data"), Path::new("/data/a/sub"), true).unwrap();
        assert_eq!(name, "a/sub/");
    }

    #[test]
    fn relative_base() {
        let name = archive_name(Path::new("./src"), Path::new("./src/lib.rs"), false).unwrap();
        assert_eq!(name, "lib.rs");
    }

    #[test]
    fn empty_base_for_bare_file() {
        let name = archive_name(Path::new(""), Path::new("notes.txt"), false).unwrap();
        assert_eq!(name, "notes.txt");
    }

    #[test]
    fn rejects_base_itself() {
        assert!(archive_name(Path::new("/data"), Path::new("/data"), true).is_err());
    }

    #[test]
    fn rejects_outside_base() {
        assert!(archive_name(Path::new("/data"), Path::new("/other/x"), false).is_err());
    }

    #[test]
    fn rejects_parent_traversal() {
        let err = archive_name(Path::new("/data"), Path::new("/data/../etc/passwd"), false);
        assert!(matches!(err, Err(ArchiveError::InvalidName(_))));
    }

    #[test]
    fn accepts_dotfiles() {
        let name = archive_name(Path::new("/d"), Path::new("/d/.config/x.json"), false).unwrap();
        assert_eq!(name, ".config/x.json");
    }

    #[cfg(unix)]
    #[test]
    fn rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new("/d").join(OsStr::from_bytes(b"bad\xff"));
        assert!(archive_name(Path::new("/d"), &path, false).is_err());
    }
}
