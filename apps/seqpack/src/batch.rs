//! Source and destination list files for `--batch`.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

/// Parses a list: one path per line, whitespace trimmed, surrounding double
/// quotes removed, blank lines skipped.
pub fn parse_list<R: BufRead>(input: R) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in input.lines() {
        let line = line?;
        let entry = line.trim().trim_matches('"').trim();
        if !entry.is_empty() {
            paths.push(PathBuf::from(entry));
        }
    }
    Ok(paths)
}

fn read_list(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open list file {}", path.display()))?;
    parse_list(std::io::BufReader::new(file))
        .with_context(|| format!("cannot read list file {}", path.display()))
}

/// Loads every source from `src_list` and the first destination in
/// `dst_list`. Either list being empty is an error.
pub fn load(src_list: &Path, dst_list: &Path) -> anyhow::Result<(Vec<PathBuf>, PathBuf)> {
    let sources = read_list(src_list)?;
    if sources.is_empty() {
        bail!("{} lists no sources", src_list.display());
    }

    let mut destinations = read_list(dst_list)?;
    if destinations.is_empty() {
        bail!("{} lists no destination", dst_list.display());
    }
    if destinations.len() > 1 {
        tracing::warn!(
            list = %dst_list.display(),
            ignored = destinations.len() - 1,
            "only the first destination is used"
        );
    }
    let destination = destinations.swap_remove(0);

    tracing::info!(
        sources = sources.len(),
        destination = %destination.display(),
        "batch loaded"
    );
    Ok((sources, destination))
}
