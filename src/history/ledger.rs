use anyhow::{Context, Result};
use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::state::Category;

/// Append-only list of finished entity ids, one per line.
///
/// The whole file is read into `seen` on open; `mark_done` appends a line
/// and updates the set, so lookups never touch the disk.
#[derive(Debug)]
pub struct CompletionLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl CompletionLedger {
    /// Open the ledger for `category` under `dir` (`<dir>/<category>.txt`).
    pub fn open(dir: &Path, category: Category) -> Result<Self> {
        Self::open_path(dir.join(category.ledger_file()))
    }

    /// Open (or lazily create) a ledger at an explicit path.
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut seen = HashSet::new();
        if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading ledger {}", path.display()))?;
            seen.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string),
            );
        }
        debug!(ledger = %path.display(), entries = seen.len(), "loaded ledger");
        Ok(Self { path, seen })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_done(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Record `id` as finished. Returns `false` (and writes nothing) if it
    /// already was.
    pub fn mark_done(&mut self, id: &str) -> Result<bool> {
        if self.seen.contains(id) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory {}", parent.display()))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening ledger {}", self.path.display()))?;
        writeln!(file, "{}", id).with_context(|| format!("appending to {}", self.path.display()))?;
        self.seen.insert(id.to_string());
        Ok(true)
    }

    /// Ids from `ids` that are not yet done, in input order.
    pub fn pending<'a, I>(&self, ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| !self.is_done(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mark_done_persists_across_reopen() -> Result<()> {
        let dir = tempdir()?;
        let mut ledger = CompletionLedger::open(dir.path(), Category::Primary)?;
        assert!(ledger.is_empty());
        assert!(ledger.mark_done("Alm")?);
        assert!(ledger.mark_done("Celica")?);

        let reopened = CompletionLedger::open(dir.path(), Category::Primary)?;
        assert!(reopened.is_done("Alm"));
        assert!(reopened.is_done("Celica"));
        assert!(!reopened.is_done("Berkut"));
        assert_eq!(reopened.path(), dir.path().join("heroes.txt"));
        Ok(())
    }

    #[test]
    fn marking_twice_writes_once() -> Result<()> {
        let dir = tempdir()?;
        let mut ledger = CompletionLedger::open(dir.path(), Category::Refine)?;
        assert!(ledger.mark_done("Falchion")?);
        assert!(!ledger.mark_done("Falchion")?);
        assert_eq!(fs::read_to_string(ledger.path())?, "Falchion\n");
        Ok(())
    }

    #[test]
    fn categories_do_not_share_ledgers() -> Result<()> {
        let dir = tempdir()?;
        CompletionLedger::open(dir.path(), Category::Primary)?.mark_done("Alm")?;
        let variants = CompletionLedger::open(dir.path(), Category::Variant)?;
        assert!(!variants.is_done("Alm"));
        Ok(())
    }

    #[test]
    fn pending_keeps_input_order() -> Result<()> {
        let dir = tempdir()?;
        let mut ledger = CompletionLedger::open_path(dir.path().join("x.txt"))?;
        ledger.mark_done("b")?;
        assert_eq!(ledger.pending(["a", "b", "c"]), vec!["a", "c"]);
        Ok(())
    }
}
