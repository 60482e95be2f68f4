//! Key-deduplicated CSV files.
//!
//! Every operation is a read-modify-write of one whole file. Nothing here
//! locks: callers that run entities in parallel must serialise writes to
//! the same file themselves.
//!
//! Once a file exists its header is authoritative; the caller's header only
//! seeds new files and tells us how to read the incoming rows.

pub mod file;

use anyhow::{bail, Result};
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::process::table::column_index;
use crate::process::Table;
use file::{read_rows, read_table, write_rows, write_rows_atomic};

/// One logical table backed by one CSV file.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, `None` if the file is missing or empty.
    pub fn read(&self) -> Result<Option<Table>> {
        read_table(&self.path)
    }

    fn load_or_seed(&self, header: &[String]) -> Result<Table> {
        Ok(self
            .read()?
            .unwrap_or_else(|| Table::new(header.to_vec())))
    }

    /// Insert `row`, replacing any row that shares its `key_field` value.
    pub fn upsert_row_by_key(&self, header: &[String], row: &[String], key_field: &str) -> Result<()> {
        self.upsert_rows_by_key(header, &[row.to_vec()], key_field)?;
        Ok(())
    }

    /// Batch form of [`upsert_row_by_key`](Self::upsert_row_by_key).
    ///
    /// Existing rows keep their relative order; replaced rows stay where they
    /// were and unseen keys are appended. Incoming rows with an empty key are
    /// dropped; keyless rows already in the file are left alone.
    /// Returns how many incoming rows were applied.
    pub fn upsert_rows_by_key(
        &self,
        header: &[String],
        rows: &[Vec<String>],
        key_field: &str,
    ) -> Result<usize> {
        let table = self.load_or_seed(header)?;
        let Some(key_idx) = table.column(key_field) else {
            warn!(path = %self.path.display(), key_field, "no key column; rows not written");
            return Ok(0);
        };
        warn_dropped_columns(&self.path, header, &table.header);

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + rows.len());
        for row in table.rows {
            if !put_keyed(&mut index, &mut kept, key_idx, row.clone()) {
                // keyless rows already on disk stay where they are
                kept.push(row);
            }
        }
        let mut applied = 0;
        for row in rows {
            if put_keyed(&mut index, &mut kept, key_idx, reshape(row, header, &table.header)) {
                applied += 1;
            } else {
                debug!(path = %self.path.display(), "row without `{}` skipped", key_field);
            }
        }

        let mut out = Vec::with_capacity(kept.len() + 1);
        out.push(table.header);
        out.extend(kept);
        write_rows(&self.path, &out)?;
        debug!(path = %self.path.display(), applied, "upserted rows");
        Ok(applied)
    }

    /// Drop every row whose `key_field` equals the key of the first incoming
    /// row, then append all incoming rows. Returns how many rows were removed.
    pub fn replace_rows_for_key(
        &self,
        header: &[String],
        rows: &[Vec<String>],
        key_field: &str,
    ) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut table = self.load_or_seed(header)?;
        let Some(key_idx) = table.column(key_field) else {
            warn!(path = %self.path.display(), key_field, "no key column; rows not written");
            return Ok(0);
        };
        warn_dropped_columns(&self.path, header, &table.header);

        let incoming: Vec<Vec<String>> = rows
            .iter()
            .map(|r| reshape(r, header, &table.header))
            .collect();
        let key = incoming[0].get(key_idx).cloned().unwrap_or_default();
        if key.trim().is_empty() {
            warn!(path = %self.path.display(), "first row has no `{}`; rows not written", key_field);
            return Ok(0);
        }

        let before = table.rows.len();
        table.rows.retain(|r| r.get(key_idx) != Some(&key));
        let removed = before - table.rows.len();
        table.rows.extend(incoming);

        let mut out = Vec::with_capacity(table.rows.len() + 1);
        out.push(table.header);
        out.extend(table.rows);
        write_rows(&self.path, &out)?;
        debug!(path = %self.path.display(), key = %key, removed, added = rows.len(), "replaced rows");
        Ok(removed)
    }

    /// Append rows that are not already present verbatim. An empty `header`
    /// means the file has no header line. Returns how many rows were added.
    pub fn append_unique_rows(&self, header: &[String], rows: &[Vec<String>]) -> Result<usize> {
        let (file_header, existing) = if header.is_empty() {
            (Vec::new(), read_rows(&self.path)?.unwrap_or_default())
        } else {
            let table = self.load_or_seed(header)?;
            (table.header, table.rows)
        };

        let mut seen: HashSet<Vec<String>> = existing.iter().cloned().collect();
        let mut added = Vec::new();
        for row in rows {
            let row = reshape(row, header, &file_header);
            if !row.is_empty() && seen.insert(row.clone()) {
                added.push(row);
            }
        }
        if added.is_empty() && self.path.exists() {
            return Ok(0);
        }

        let count = added.len();
        let mut out = Vec::with_capacity(existing.len() + count + 1);
        if !file_header.is_empty() {
            out.push(file_header);
        }
        out.extend(existing);
        out.extend(added);
        write_rows(&self.path, &out)?;
        debug!(path = %self.path.display(), added = count, "appended rows");
        Ok(count)
    }

    /// Headerless, variable-width file keyed by the first field: replace the
    /// row for `row[0]` in place, or append it.
    pub fn upsert_headerless_row(&self, row: &[String]) -> Result<()> {
        let Some(key) = row.first() else {
            return Ok(());
        };
        let existing = read_rows(&self.path)?.unwrap_or_default();
        let mut out = Vec::with_capacity(existing.len() + 1);
        let mut found = false;
        for r in existing {
            if r.first() == Some(key) {
                if !found {
                    out.push(row.to_vec());
                    found = true;
                }
                continue;
            }
            out.push(r);
        }
        if !found {
            out.push(row.to_vec());
        }
        write_rows(&self.path, &out)
    }

    /// Merge one sparse record into a wide table: unseen field names are
    /// appended to the header, older rows are padded, the row for the key is
    /// replaced or appended. Written atomically.
    pub fn upsert_wide_record(&self, fields: &[(String, String)], key_field: &str) -> Result<()> {
        let Some(new_key) = fields
            .iter()
            .find(|(f, _)| f == key_field)
            .map(|(_, v)| v.clone())
            .filter(|v| !v.trim().is_empty())
        else {
            bail!("wide record for {} has no `{}` value", self.path.display(), key_field);
        };

        let existing = self.read()?.unwrap_or_default();
        let old_key_idx = column_index(&existing.header, key_field);
        let mut header = existing.header;
        for (field, _) in fields {
            if !header.contains(field) {
                header.push(field.clone());
            }
        }

        let value_row: Vec<String> = header
            .iter()
            .map(|h| {
                fields
                    .iter()
                    .find(|(f, _)| f == h)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();

        let width = header.len();
        let mut out = Vec::with_capacity(existing.rows.len() + 2);
        out.push(header);
        let mut found = false;
        for row in existing.rows {
            let is_match = old_key_idx.and_then(|i| row.get(i)) == Some(&new_key);
            if is_match {
                if !found {
                    out.push(value_row.clone());
                    found = true;
                }
                continue;
            }
            out.push((0..width).map(|i| row.get(i).cloned().unwrap_or_default()).collect());
        }
        if !found {
            out.push(value_row);
        }

        write_rows_atomic(&self.path, &out)?;
        debug!(path = %self.path.display(), key = %new_key, replaced = found, "upserted wide record");
        Ok(())
    }
}

/// Insert or replace `row` by the value at `key_idx`. `false` if that value is empty.
fn put_keyed(
    index: &mut HashMap<String, usize>,
    kept: &mut Vec<Vec<String>>,
    key_idx: usize,
    row: Vec<String>,
) -> bool {
    let key = row.get(key_idx).cloned().unwrap_or_default();
    if key.trim().is_empty() {
        return false;
    }
    match index.get(&key) {
        Some(&i) => kept[i] = row,
        None => {
            index.insert(key, kept.len());
            kept.push(row);
        }
    }
    true
}

/// Lay `row` (shaped by `from`) out on the `to` header by column name.
/// Identical or empty headers pass the row through untouched.
fn reshape(row: &[String], from: &[String], to: &[String]) -> Vec<String> {
    if from.is_empty() || to.is_empty() || from == to {
        return row.to_vec();
    }
    to.iter()
        .map(|name| {
            column_index(from, name)
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

fn warn_dropped_columns(path: &Path, from: &[String], to: &[String]) {
    if from.is_empty() || from == to {
        return;
    }
    let dropped: Vec<&String> = from
        .iter()
        .filter(|c| column_index(to, c).is_none())
        .collect();
    if !dropped.is_empty() {
        warn!(path = %path.display(), ?dropped, "columns unknown to the file were dropped");
    }
}
