// src/history/mod.rs
pub mod ledger;
pub mod state;

pub use ledger::CompletionLedger;
pub use state::Category;

use anyhow::Result;
use std::path::Path;

/// Completed-id counts for every category under `dir`.
pub fn load_counts(dir: &Path) -> Result<Vec<(Category, usize)>> {
    Category::ALL
        .iter()
        .map(|&c| Ok((c, CompletionLedger::open(dir, c)?.len())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn counts_cover_every_category() -> Result<()> {
        let dir = tempdir()?;
        let mut refines = CompletionLedger::open(dir.path(), Category::Refine)?;
        refines.mark_done("Falchion")?;
        refines.mark_done("Ragnell")?;

        let counts = load_counts(dir.path())?;
        assert_eq!(counts.len(), Category::ALL.len());
        assert!(counts.contains(&(Category::Refine, 2)));
        assert!(counts.contains(&(Category::Primary, 0)));
        Ok(())
    }
}
