use anyhow::{anyhow, bail, Context, Result};
use csv::{QuoteStyle, Reader, ReaderBuilder, Terminator, Writer, WriterBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io;

/// Trailing portrait suffix on wiki icon filenames, e.g. `Alm_Hero-King_Face_FC.webp`.
static ICON_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_Face(_FC)?\.(webp|png)$").expect("icon suffix regex"));

/// Reader used for every CSV file and line: no header handling, ragged rows allowed.
pub fn csv_reader<R: io::Read>(rdr: R) -> Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr)
}

/// Writer used for every CSV file and line: `\n` terminated, quotes only when needed.
pub fn csv_writer<W: io::Write>(wtr: W) -> Writer<W> {
    WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(wtr)
}

/// Split one CSV line into cells, honouring quoted commas.
///
/// Errors on unbalanced quoting: every well-formed line carries an even
/// number of `"` characters, since embedded quotes are doubled.
pub fn parse_line(line: &str) -> Result<Vec<String>> {
    if line.matches('"').count() % 2 != 0 {
        bail!("unbalanced quoting");
    }
    let mut rdr = csv_reader(line.as_bytes());
    match rdr.records().next() {
        Some(record) => {
            let record = record.context("parsing CSV line")?;
            Ok(record.iter().map(str::to_string).collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Render cells back into a single CSV line (no terminator).
pub fn render_line<S: AsRef<str>>(cells: &[S]) -> Result<String> {
    if cells.is_empty() {
        return Ok(String::new());
    }
    let mut wtr = csv_writer(Vec::new());
    wtr.write_record(cells.iter().map(|c| c.as_ref()))
        .context("rendering CSV line")?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV line: {}", e.error()))?;
    let mut line = String::from_utf8(bytes).context("CSV line is not UTF-8")?;
    while line.ends_with('\n') {
        line.pop();
    }
    Ok(line)
}

/// True when every cell is empty after trimming.
pub fn is_blank_row<S: AsRef<str>>(cells: &[S]) -> bool {
    cells.iter().all(|c| c.as_ref().trim().is_empty())
}

/// Replace non-breaking spaces with plain spaces.
pub fn normalize_spaces(raw: &str) -> String {
    raw.replace('\u{a0}', " ")
}

/// Clean an info-box label: drop the collapse widget text, normalise spaces, trim.
pub fn clean_label(raw: &str) -> String {
    normalize_spaces(&raw.replace("[ExpandCollapse]", ""))
        .trim()
        .to_string()
}

/// Derive the join key from an icon filename or URL.
///
/// `https://…/Alm_Hero-King_Face_FC.webp` → `Alm_Hero-King`. Returns `None`
/// when nothing usable is left.
pub fn icon_key(filename: &str) -> Option<String> {
    let last = filename
        .trim()
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or("");
    let key = ICON_SUFFIX.replace(last, "");
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
