//! Turns one [`RawEntity`] into a [`NormalizedRecord`] ready for the stores.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::classify::{classify, Section, PASSIVES_TABLE};
use super::projection::FieldProjector;
use super::raw_table::{RawEntity, RawSection};
use super::table::Table;
use super::utils::{clean_label, icon_key, is_blank_row, normalize_spaces, parse_line, render_line};

/// Name of the join key column in every keyed output.
pub const KEY_FIELD: &str = "Key";

/// Section names that hold the icon reference rather than a table.
const ICON_SECTIONS: [&str; 2] = ["icon url", "icon filename"];

/// Ordered info-box fields; `Key` is always first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    fields: Vec<(String, String)>,
}

impl Identity {
    fn with_key(key: String) -> Self {
        Self {
            fields: vec![(KEY_FIELD.to_string(), key)],
        }
    }

    pub fn key(&self) -> &str {
        self.fields.first().map(|(_, v)| v.as_str()).unwrap_or("")
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Set `field`, replacing in place if already present.
    fn set(&mut self, field: String, value: String) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

/// Everything persisted on behalf of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub identity: Identity,
    /// Related entity ids, deduplicated, never containing the key itself.
    pub relations: Vec<String>,
    pub tables: BTreeMap<String, Table>,
    pub hero_skills: BTreeMap<String, Table>,
    pub skills: BTreeMap<String, Table>,
}

impl NormalizedRecord {
    pub fn key(&self) -> &str {
        self.identity.key()
    }
}

/// Owns the projection memo for a run; feed it entities one at a time.
#[derive(Debug, Default)]
pub struct Normalizer {
    projector: FieldProjector,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projector(&self) -> &FieldProjector {
        &self.projector
    }

    #[tracing::instrument(level = "debug", skip_all, fields(entity = %entity.entity_id))]
    pub fn normalize(&mut self, entity: &RawEntity) -> NormalizedRecord {
        let identity = extract_identity(entity);
        let key = identity.key().to_string();
        let relations = extract_relations(&key, &entity.relations_section);

        let sections: Vec<Section> = entity
            .remaining_sections
            .iter()
            .filter_map(|raw| {
                if raw.name == PASSIVES_TABLE {
                    materialize(&key, &clean_passives(raw))
                } else {
                    materialize(&key, raw)
                }
            })
            .collect();
        debug!(key = %key, sections = sections.len(), "materialized tables");

        let classified = classify(&sections, &mut self.projector);
        NormalizedRecord {
            identity,
            relations,
            tables: classified.tables,
            hero_skills: classified.hero_skills,
            skills: classified.skills,
        }
    }
}

/// Info box → ordered field map; the key comes from the icon when there is one.
pub fn extract_identity(entity: &RawEntity) -> Identity {
    let key = entity
        .icon_filename
        .as_deref()
        .and_then(icon_key)
        .unwrap_or_else(|| entity.entity_id.clone());
    let mut identity = Identity::with_key(key);

    for row in &entity.identity_section {
        if row.len() < 2 {
            continue;
        }
        let field = clean_label(&row[0]);
        if field.is_empty() {
            continue;
        }
        if field == KEY_FIELD {
            debug!("info box carries its own `Key`; keeping the resolved key");
            continue;
        }
        let value = normalize_spaces(&row[1..].join(" "));
        identity.set(field, value);
    }
    identity
}

/// Trim, drop blanks and duplicates, and drop the entity's own key.
pub fn extract_relations(key: &str, raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && *id != key)
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Prefix the header with `Key` and every data row with `key`.
/// Malformed lines are skipped with a warning.
pub fn materialize(key: &str, raw: &RawSection) -> Option<Section> {
    if ICON_SECTIONS.contains(&raw.name.trim().to_lowercase().as_str()) {
        return None;
    }
    if raw.is_blank() {
        return None;
    }

    let header = match parse_line(raw.header.trim()) {
        Ok(cells) => cells,
        Err(err) => {
            warn!(table = %raw.name, error = %err, "malformed header; table skipped");
            return None;
        }
    };
    let mut table = Table::new(
        std::iter::once(KEY_FIELD.to_string())
            .chain(header)
            .collect(),
    );

    for line in raw.rows.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        match parse_line(line) {
            Ok(cells) => {
                let mut row = Vec::with_capacity(cells.len() + 1);
                row.push(key.to_string());
                row.extend(cells);
                table.rows.push(row);
            }
            Err(err) => {
                let preview: String = line.chars().take(50).collect();
                warn!(table = %raw.name, line = %preview, error = %err, "malformed line skipped");
            }
        }
    }

    Some(Section {
        name: raw.name.clone(),
        table,
    })
}

/// The passives table carries a dangling empty column: strip empty trailing
/// cells from the header and every row, leaving inner cells untouched.
pub fn clean_passives(raw: &RawSection) -> RawSection {
    let header = clean_passives_line(&raw.header).unwrap_or_default();
    let rows = raw
        .rows
        .iter()
        .filter_map(|l| clean_passives_line(l))
        .collect();
    RawSection::new(raw.name.clone(), header, rows)
}

fn clean_passives_line(line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return None;
    }
    let mut cells = match parse_line(line) {
        Ok(cells) => cells,
        Err(err) => {
            // left as-is; materialization reports and skips it
            debug!(error = %err, "passives line not cleaned");
            return Some(line.to_string());
        }
    };
    while cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    if is_blank_row(&cells) {
        return None;
    }
    render_line(cells.as_slice()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Category;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|c| c.to_string()).collect()
    }

    fn alm() -> RawEntity {
        RawEntity {
            entity_id: "Alm_Hero_King".into(),
            category: Category::Primary,
            icon_filename: Some("Alm_Face_FC.webp".into()),
            identity_section: vec![s(&["Name", "Alm"]), s(&["Title", "Hero-King"])],
            relations_section: s(&["Alm_Saint_King", "Alm", " ", "Alm_Saint_King", "Celica"]),
            remaining_sections: vec![
                RawSection::from_text("Stats", "Level,HP\n1,18"),
                RawSection::from_text("Icon Filename", "Alm_Face_FC.webp"),
                RawSection::from_text("Weapons", "Name,Might,Default,Unlock\nFalchion,16,★5,—"),
                RawSection::from_text("Empty", "  \n "),
                RawSection::from_text(
                    "Passives",
                    "Type,Name,SP,Description,Unlock,\nA,Death Blow 1,50,\"Grants Atk+2, on init\",★3,\n,Death Blow 2,100,Atk+4,★4,",
                ),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn identity_uses_icon_key_then_info_fields() {
        let rec = Normalizer::new().normalize(&alm());
        assert_eq!(rec.key(), "Alm");
        let fields: Vec<(&str, &str)> = rec
            .identity
            .fields()
            .iter()
            .map(|(f, v)| (f.as_str(), v.as_str()))
            .collect();
        assert_eq!(fields, vec![("Key", "Alm"), ("Name", "Alm"), ("Title", "Hero-King")]);
    }

    #[test]
    fn identity_falls_back_to_entity_id() {
        let mut entity = alm();
        entity.icon_filename = None;
        entity.identity_section.clear();
        let identity = extract_identity(&entity);
        assert_eq!(identity.key(), "Alm_Hero_King");
        assert_eq!(identity.fields().len(), 1);
    }

    #[test]
    fn identity_joins_multi_cell_rows_and_fixes_spaces() {
        let mut entity = alm();
        entity.identity_section = vec![
            s(&["Release\u{a0}Date", "Feb", "2\u{a0}2017"]),
            s(&["Lonely"]),
            s(&["Key", "Hijack"]),
            s(&["Name", "Alm"]),
            s(&["Name", "Alm!"]),
        ];
        let identity = extract_identity(&entity);
        assert_eq!(identity.key(), "Alm");
        assert_eq!(identity.get("Release Date"), Some("Feb 2 2017"));
        assert_eq!(identity.get("Lonely"), None);
        assert_eq!(identity.get("Name"), Some("Alm!"));
        assert_eq!(identity.fields()[1].0, "Release Date");
    }

    #[test]
    fn relations_are_deduplicated_and_exclude_self() {
        let rec = Normalizer::new().normalize(&alm());
        assert_eq!(rec.relations, s(&["Alm_Saint_King", "Celica"]));
        assert!(extract_relations("Alm", &[]).is_empty());
    }

    #[test]
    fn materialize_prefixes_key_and_skips_bad_lines() {
        let raw = RawSection::new(
            "Weapons",
            "Name,Might",
            s(&["Falchion,16", "   ", "\"Broken,1", "\"Sword, Iron\",6"]),
        );
        let section = materialize("Alm", &raw).unwrap();
        assert_eq!(section.table.header, s(&["Key", "Name", "Might"]));
        assert_eq!(
            section.table.rows,
            vec![s(&["Alm", "Falchion", "16"]), s(&["Alm", "Sword, Iron", "6"])]
        );
    }

    #[test]
    fn icon_and_blank_sections_are_not_materialized() {
        assert!(materialize("Alm", &RawSection::from_text("Icon URL", "http://x")).is_none());
        assert!(materialize("Alm", &RawSection::from_text("Nothing", " ")).is_none());
    }

    #[test]
    fn passives_cleanup_strips_trailing_cells_only() {
        let raw = &alm().remaining_sections[4];
        let cleaned = clean_passives(raw);
        assert_eq!(cleaned.header, "Type,Name,SP,Description,Unlock");
        assert_eq!(
            cleaned.rows,
            vec![
                "A,Death Blow 1,50,\"Grants Atk+2, on init\",★3".to_string(),
                // an empty slot type stays empty
                ",Death Blow 2,100,Atk+4,★4".to_string(),
            ]
        );
    }

    #[test]
    fn passives_cleanup_keeps_inner_empty_cells() {
        let raw = RawSection::new("Passives", "Type,Name,SP,", vec![",Fury 1,,".to_string()]);
        let cleaned = clean_passives(&raw);
        assert_eq!(cleaned.header, "Type,Name,SP");
        assert_eq!(cleaned.rows, vec![",Fury 1".to_string()]);
    }

    #[test]
    fn normalize_fills_every_category() {
        let rec = Normalizer::new().normalize(&alm());
        assert!(rec.tables.contains_key("Weapons"));
        assert!(rec.tables.contains_key("Passives"));
        assert!(!rec.tables.contains_key("Stats"));
        assert!(rec.hero_skills.contains_key("Stats"));
        assert!(!rec.hero_skills.contains_key("Icon Filename"));

        let passives = &rec.hero_skills["Passives"];
        assert_eq!(passives.header, s(&["Key", "Name", "SP", "Unlock"]));
        for table in rec.hero_skills.values() {
            assert!(table.rows.iter().all(|r| r[0] == "Alm"));
        }

        let catalog = &rec.skills["Passives"];
        assert_eq!(catalog.header, s(&["Name", "Type", "Description", "SP"]));
        assert_eq!(
            catalog.rows[0],
            s(&["Death Blow 1", "A", "Grants Atk+2, on init", "50"])
        );
    }
}
