//! Incremental driver: normalize, save, then mark done.

use anyhow::Result;
use std::collections::{hash_map::Entry, HashMap};
use std::path::Path;
use tracing::{debug, error, info};

use crate::history::{Category, CompletionLedger};
use crate::process::{Normalizer, RawEntity};
use crate::save::Layout;

/// What happened to one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Processed,
    /// Already in its category's ledger.
    Skipped,
}

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

pub struct Pipeline {
    layout: Layout,
    normalizer: Normalizer,
    ledgers: HashMap<Category, CompletionLedger>,
    force: bool,
}

impl Pipeline {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            normalizer: Normalizer::new(),
            ledgers: HashMap::new(),
            force: false,
        }
    }

    /// Re-process entities even when the ledger already lists them.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    fn ledger(&mut self, category: Category) -> Result<&mut CompletionLedger> {
        Ok(match self.ledgers.entry(category) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => v.insert(CompletionLedger::open(self.layout.root(), category)?),
        })
    }

    /// Ids not yet completed for `category`, in input order.
    pub fn pending<'a, I>(&mut self, category: Category, ids: I) -> Result<Vec<&'a str>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Ok(self.ledger(category)?.pending(ids))
    }

    /// Normalize and persist one entity. The ledger entry is only written
    /// once every output file has been saved.
    #[tracing::instrument(level = "info", skip_all, fields(entity = %entity.entity_id, category = entity.category.as_str()))]
    pub fn process(&mut self, entity: &RawEntity) -> Result<Outcome> {
        let id = entity.entity_id.as_str();
        if !self.force && self.ledger(entity.category)?.is_done(id) {
            debug!("already done");
            return Ok(Outcome::Skipped);
        }

        match entity.category {
            Category::Manual => {
                let added = self.layout.save_manuals(&entity.manual_rows)?;
                debug!(added, "manual rows appended");
            }
            category => {
                let record = self.normalizer.normalize(entity);
                self.layout.save_record(&record)?;
                if category == Category::Refine {
                    if let Some(line) = entity.refine_data.as_deref() {
                        self.layout.save_refine(line)?;
                    }
                }
            }
        }

        self.ledger(entity.category)?.mark_done(id)?;
        info!("processed");
        Ok(Outcome::Processed)
    }

    /// Process every entity; failures are logged and counted, never fatal.
    pub fn run<I>(&mut self, entities: I) -> Summary
    where
        I: IntoIterator<Item = Result<RawEntity>>,
    {
        let mut summary = Summary::default();
        for entity in entities {
            let entity = match entity {
                Ok(e) => e,
                Err(e) => {
                    error!("could not load entity: {:#}", e);
                    summary.failed += 1;
                    continue;
                }
            };
            match self.process(&entity) {
                Ok(Outcome::Processed) => summary.processed += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    error!(entity = %entity.entity_id, "failed: {:#}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Open a pipeline rooted at `data_dir`.
pub fn open(data_dir: &Path, write_tables: bool, force: bool) -> Pipeline {
    Pipeline::new(Layout::new(data_dir).with_tables(write_tables)).force(force)
}
