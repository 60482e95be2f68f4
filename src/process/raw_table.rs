use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::{fs, path::Path};

use super::utils::render_line;
use crate::history::Category;

/// One named table lifted off a hero page, still as CSV text lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawSection {
    pub name: String,
    /// Header as a CSV line, without the join key column.
    #[serde(default, deserialize_with = "line_or_cells")]
    pub header: String,
    /// Data rows as CSV lines.
    #[serde(default, deserialize_with = "lines_or_cells")]
    pub rows: Vec<String>,
}

impl RawSection {
    pub fn new(name: impl Into<String>, header: impl Into<String>, rows: Vec<String>) -> Self {
        Self {
            name: name.into(),
            header: header.into(),
            rows,
        }
    }

    /// Build from a block of CSV text whose first line is the header.
    #[cfg(test)]
    pub(crate) fn from_text(name: impl Into<String>, text: &str) -> Self {
        let mut lines = text.trim().lines();
        let header = lines.next().unwrap_or("").to_string();
        Self::new(name, header, lines.map(str::to_string).collect())
    }

    /// Build from already split cells.
    pub fn from_cells(name: impl Into<String>, header: &[&str], rows: &[&[&str]]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|r| render_line(*r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, render_line(header)?, rows))
    }

    /// True when there is nothing but whitespace in the header and rows.
    pub fn is_blank(&self) -> bool {
        self.header.trim().is_empty() && self.rows.iter().all(|r| r.trim().is_empty())
    }
}

/// Everything the page extractor hands over for one entity.
///
/// The info box and the related-heroes list are named fields rather than
/// "the first two sections", so upstream ordering changes cannot shift them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawEntity {
    pub entity_id: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub icon_filename: Option<String>,
    /// Info box rows: `[label, value, ...]`.
    #[serde(default)]
    pub identity_section: Vec<Vec<String>>,
    #[serde(default)]
    pub relations_section: Vec<String>,
    #[serde(default)]
    pub remaining_sections: Vec<RawSection>,
    /// Refine entities only: one CSV line for the refine catalog.
    #[serde(default)]
    pub refine_data: Option<String>,
    /// Manual entities only: CSV lines appended to the manuals file.
    #[serde(default)]
    pub manual_rows: Vec<String>,
}

impl RawEntity {
    pub fn from_json(text: &str) -> Result<Self> {
        let entity: RawEntity = serde_json::from_str(text).context("parsing raw entity JSON")?;
        if entity.entity_id.trim().is_empty() {
            bail!("raw entity has an empty `entity_id`");
        }
        Ok(entity)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading entity from {}", path.display()))
    }
}

/// Sections may arrive either as pre-rendered CSV lines or as cell lists.
#[derive(Deserialize)]
#[serde(untagged)]
enum LineInput {
    Line(String),
    Cells(Vec<String>),
}

impl LineInput {
    fn into_line(self) -> Result<String> {
        match self {
            LineInput::Line(line) => Ok(line),
            LineInput::Cells(cells) => render_line(cells.as_slice()),
        }
    }
}

fn line_or_cells<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
    LineInput::deserialize(de)?
        .into_line()
        .map_err(serde::de::Error::custom)
}

fn lines_or_cells<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
    Vec::<LineInput>::deserialize(de)?
        .into_iter()
        .map(|l| l.into_line().map_err(serde::de::Error::custom))
        .collect()
}
