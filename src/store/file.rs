use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

use crate::process::utils::{csv_reader, csv_writer};
use crate::process::Table;

/// Read every record of a CSV file. `None` if the file does not exist.
pub fn read_rows(path: &Path) -> Result<Option<Vec<Vec<String>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv_reader(BufReader::new(file));
    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record =
            record.with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Some(rows))
}

/// Read a CSV file whose first record is the header. `None` if missing or empty.
pub fn read_table(path: &Path) -> Result<Option<Table>> {
    let mut rows = match read_rows(path)? {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Ok(None),
    };
    let header = rows.remove(0);
    Ok(Some(Table::with_rows(header, rows)))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn write_records<W: Write>(out: W, rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv_writer(out);
    for row in rows.iter().filter(|r| !r.is_empty()) {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Truncate and rewrite `path`. Not crash safe; re-running repairs it.
pub fn write_rows(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_records(BufWriter::new(file), rows).with_context(|| format!("writing {}", path.display()))
}

/// Write to a temp file next to `path`, then rename over it. On any error
/// the temp file is removed and `path` is left untouched.
pub fn write_rows_atomic(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    write_records(BufWriter::new(&mut tmp), rows)
        .with_context(|| format!("writing temp file for {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("renaming temp file over {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_none() -> Result<()> {
        let dir = tempdir()?;
        assert!(read_rows(&dir.path().join("nope.csv"))?.is_none());
        assert!(read_table(&dir.path().join("nope.csv"))?.is_none());
        Ok(())
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_files() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("info.csv");
        let rows = vec![
            vec!["Key".to_string(), "Name".to_string()],
            vec!["Alm".to_string(), "Alm, Hero".to_string()],
        ];
        write_rows_atomic(&path, &rows)?;
        write_rows_atomic(&path, &rows)?;

        assert_eq!(fs::read_to_string(&path)?, "Key,Name\nAlm,\"Alm, Hero\"\n");
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())?.collect();
        assert_eq!(entries.len(), 1);

        let table = read_table(&path)?.unwrap();
        assert_eq!(table.rows[0][1], "Alm, Hero");
        Ok(())
    }
}
