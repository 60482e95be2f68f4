//! Sorts an entity's materialized tables into the three output categories
//! in a single traversal.

use std::collections::BTreeMap;
use tracing::debug;

use super::projection::{project_row, FieldProjector, ProjectionPolicy};
use super::table::Table;
use super::utils::is_blank_row;

/// Generic tables and the skill catalog only start at this table; the stat
/// and growth tables before it are not keyed by name.
pub const GATE_TABLE: &str = "Weapons";
pub const PASSIVES_TABLE: &str = "Passives";
/// A `Passives` section only counts as a skill table if it carries one of these.
const PASSIVES_SKILL_COLUMNS: [&str; 3] = ["Type", "SP", "Unlock"];

/// A page table after the join key column has been prepended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Classified {
    /// Display tables, full width, keyed rows.
    pub tables: BTreeMap<String, Table>,
    /// Per-entity skill references, keyed rows.
    pub hero_skills: BTreeMap<String, Table>,
    /// Entity-independent skill catalog, no join key.
    pub skills: BTreeMap<String, Table>,
}

/// Walk `sections` once, filling all three categories.
pub fn classify(sections: &[Section], projector: &mut FieldProjector) -> Classified {
    let mut out = Classified::default();
    let mut gated = false;

    for section in sections {
        let name = section.name.as_str();
        let table = &section.table;
        if !gated && name == GATE_TABLE {
            gated = true;
        }

        if !table.is_empty() {
            let policy = if name.eq_ignore_ascii_case(PASSIVES_TABLE) {
                ProjectionPolicy::HeroSkillsPassives
            } else {
                ProjectionPolicy::HeroSkills
            };
            if let Some(projected) = project_table(table, policy, projector) {
                out.hero_skills.insert(name.to_string(), projected);
            }
        }

        if !gated {
            debug!(table = name, "before `{}`; not a display or catalog table", GATE_TABLE);
            continue;
        }

        if is_display_table(section) {
            if let Some(full) = project_table(table, ProjectionPolicy::Identity, projector) {
                out.tables.insert(name.to_string(), full);
            }
        } else {
            debug!(table = name, "no nameable columns; left out of display tables");
        }

        if !table.is_empty() {
            let policy = if name == PASSIVES_TABLE {
                ProjectionPolicy::Hero
            } else {
                ProjectionPolicy::Skill
            };
            if let Some(projected) = project_table(table, policy, projector) {
                out.skills.insert(name.to_string(), projected);
            }
        }
    }

    out
}

fn is_display_table(section: &Section) -> bool {
    if section.name == PASSIVES_TABLE {
        PASSIVES_SKILL_COLUMNS
            .iter()
            .any(|c| section.table.header.iter().any(|h| h == c))
    } else {
        section.table.has_column("Name")
    }
}

/// Project header and rows through `policy`, dropping rows left blank.
/// `None` when no data row survives.
fn project_table(
    table: &Table,
    policy: ProjectionPolicy,
    projector: &mut FieldProjector,
) -> Option<Table> {
    let idx = projector.project(&table.header, policy).to_vec();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| project_row(r, &idx))
        .filter(|r| !is_blank_row(r))
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(Table::with_rows(project_row(&table.header, &idx), rows))
}
