//! Routes a normalized entity onto the files under the data dir.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::process::utils::parse_line;
use crate::process::{NormalizedRecord, Table, KEY_FIELD};
use crate::store::CsvStore;

pub const INFO_FILE: &str = "info.csv";
pub const RELATIONS_FILE: &str = "related_heroes.csv";
pub const MANUALS_FILE: &str = "manuals.csv";
pub const TABLES_DIR: &str = "tables";
pub const SKILLS_DIR: &str = "skills";
/// Root-level file stems owned by the entity-wide outputs; a hero-skill
/// table with one of these names would overwrite them.
const RESERVED_STEMS: [&str; 3] = ["info", "related_heroes", "manuals"];
/// Skill catalog rows are unique by skill name.
pub const SKILL_KEY_FIELD: &str = "Name";
pub const REFINE_HEADER: [&str; 6] = [
    "Key",
    "Name",
    "Stats",
    "Description",
    "Refine Description",
    "Cost",
];

/// File layout below one data directory.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    write_tables: bool,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_tables: true,
        }
    }

    /// Turn the `tables/` display copies on or off.
    pub fn with_tables(mut self, write_tables: bool) -> Self {
        self.write_tables = write_tables;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn info(&self) -> CsvStore {
        CsvStore::new(self.root.join(INFO_FILE))
    }

    pub fn relations(&self) -> CsvStore {
        CsvStore::new(self.root.join(RELATIONS_FILE))
    }

    pub fn manuals(&self) -> CsvStore {
        CsvStore::new(self.root.join(MANUALS_FILE))
    }

    pub fn hero_skills(&self, table: &str) -> CsvStore {
        CsvStore::new(self.root.join(format!("{}.csv", file_stem(table))))
    }

    pub fn table(&self, table: &str) -> CsvStore {
        CsvStore::new(self.root.join(TABLES_DIR).join(format!("{}.csv", file_stem(table))))
    }

    pub fn skills(&self, table: &str) -> CsvStore {
        CsvStore::new(
            self.root
                .join(SKILLS_DIR)
                .join(format!("skill_{}.csv", file_stem(table))),
        )
    }

    /// Persist every output of one entity. Stops at the first failing file.
    #[tracing::instrument(level = "debug", skip_all, fields(key = %record.key()))]
    pub fn save_record(&self, record: &NormalizedRecord) -> Result<()> {
        let key = record.key();
        if key.trim().is_empty() {
            bail!("normalized record has an empty key");
        }

        self.info()
            .upsert_wide_record(record.identity.fields(), KEY_FIELD)
            .with_context(|| format!("saving info for {}", key))?;

        let mut related = Vec::with_capacity(record.relations.len() + 1);
        related.push(key.to_string());
        related.extend(record.relations.iter().cloned());
        self.relations()
            .upsert_headerless_row(&related)
            .with_context(|| format!("saving related heroes for {}", key))?;

        for (name, table) in &record.hero_skills {
            if is_reserved(name) {
                warn!(table = %name, "hero skill table name clashes with an entity-wide file; skipped");
                continue;
            }
            self.hero_skills(name)
                .replace_rows_for_key(&table.header, &table.rows, KEY_FIELD)
                .with_context(|| format!("saving hero skills `{}` for {}", name, key))?;
        }

        if self.write_tables {
            for (name, table) in &record.tables {
                self.table(name)
                    .replace_rows_for_key(&table.header, &table.rows, KEY_FIELD)
                    .with_context(|| format!("saving table `{}` for {}", name, key))?;
            }
        }

        for (name, table) in &record.skills {
            self.save_skills(name, table)
                .with_context(|| format!("saving skill catalog `{}` for {}", name, key))?;
        }
        debug!(
            hero_skills = record.hero_skills.len(),
            tables = record.tables.len(),
            skills = record.skills.len(),
            "saved record"
        );
        Ok(())
    }

    fn save_skills(&self, name: &str, table: &Table) -> Result<()> {
        if table.is_empty() {
            return Ok(());
        }
        let applied = self
            .skills(name)
            .upsert_rows_by_key(&table.header, &table.rows, SKILL_KEY_FIELD)?;
        if applied < table.rows.len() {
            debug!(table = name, skipped = table.rows.len() - applied, "unnamed skills skipped");
        }
        Ok(())
    }

    /// Upsert one refine line into the refine catalog.
    pub fn save_refine(&self, line: &str) -> Result<()> {
        let row = parse_line(line).with_context(|| format!("parsing refine data {:?}", line))?;
        let header: Vec<String> = REFINE_HEADER.iter().map(|h| h.to_string()).collect();
        self.skills("Refines")
            .upsert_row_by_key(&header, &row, SKILL_KEY_FIELD)
    }

    /// Append manual lines, skipping exact duplicates and malformed lines.
    pub fn save_manuals(&self, lines: &[String]) -> Result<usize> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            match parse_line(line) {
                Ok(row) => rows.push(row),
                Err(e) => warn!(line = %line, "skipping manual line: {e}"),
            }
        }
        self.manuals().append_unique_rows(&[], &rows)
    }
}

/// Lower-cased table name, flattened into a single path component.
fn file_stem(table: &str) -> String {
    let stem = table
        .trim()
        .to_lowercase()
        .replace("..", "_")
        .replace(['/', '\\'], "_");
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

fn is_reserved(table: &str) -> bool {
    RESERVED_STEMS.contains(&file_stem(table).as_str())
}
