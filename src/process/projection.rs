//! Column projection policies and the per-run memo of computed index lists.
//!
//! The same handful of table headers recur on every hero page, so the memo
//! is keyed by `(policy, header)` and only ever grows to the number of
//! distinct headers observed in a run.

use std::collections::HashMap;
use tracing::trace;

/// Named rule selecting which columns of a table survive into an output file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProjectionPolicy {
    /// Per-hero skill references: key, name, default flag, unlock.
    HeroSkills,
    /// Passives variant of `HeroSkills`, resolved by column name.
    HeroSkillsPassives,
    /// Catalog rows for ordinary skill tables: everything but Key/Unlock/Default.
    Skill,
    /// Catalog rows for passives: Name, Type, Description, SP in that order.
    Hero,
    /// Keep every column.
    Identity,
}

impl ProjectionPolicy {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectionPolicy::HeroSkills => "hero_skills",
            ProjectionPolicy::HeroSkillsPassives => "hero_skills_passives",
            ProjectionPolicy::Skill => "skill",
            ProjectionPolicy::Hero => "hero",
            ProjectionPolicy::Identity => "identity",
        }
    }
}

const SKILL_EXCLUDED: [&str; 3] = ["Key", "Unlock", "Default"];
const HERO_EXCLUDED: [&str; 2] = ["Key", "Unlock"];
const HERO_ORDER: [&str; 4] = ["Name", "Type", "Description", "SP"];

/// Compute the retained column indexes for `header` under `policy`.
pub fn field_indexes(header: &[String], policy: ProjectionPolicy) -> Vec<usize> {
    match policy {
        ProjectionPolicy::HeroSkills => {
            let n = header.len();
            let mut idx = vec![0];
            if n > 1 {
                idx.push(1);
                idx.push(n - 1);
            }
            if n > 2 {
                idx.push(n - 2);
            }
            idx.sort_unstable();
            idx.dedup();
            idx
        }
        ProjectionPolicy::HeroSkillsPassives => {
            let (mut name, mut sp, mut unlock) = (None, None, None);
            for (i, field) in header.iter().enumerate() {
                match field.trim().to_lowercase().as_str() {
                    "name" => name = Some(i),
                    "sp" => sp = Some(i),
                    "unlock" => unlock = Some(i),
                    _ => {}
                }
            }
            let mut idx: Vec<usize> = std::iter::once(0)
                .chain(name)
                .chain(sp)
                .chain(unlock)
                .collect();
            idx.sort_unstable();
            idx.dedup();
            idx
        }
        ProjectionPolicy::Skill => header
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.trim().is_empty() && !SKILL_EXCLUDED.contains(&f.as_str()))
            .map(|(i, _)| i)
            .collect(),
        ProjectionPolicy::Hero => {
            let kept: Vec<usize> = header
                .iter()
                .enumerate()
                .filter(|(_, f)| !f.trim().is_empty() && !HERO_EXCLUDED.contains(&f.as_str()))
                .map(|(i, _)| i)
                .collect();
            let ordered: Vec<usize> = HERO_ORDER
                .iter()
                .filter_map(|want| kept.iter().copied().find(|&i| header[i] == *want))
                .collect();
            if !ordered.is_empty() {
                ordered
            } else if !kept.is_empty() {
                kept
            } else {
                // never hand back an empty projection for a non-empty header
                (0..header.len()).collect()
            }
        }
        ProjectionPolicy::Identity => (0..header.len()).collect(),
    }
}

/// Pick `indexes` out of `row`; positions past the end of the row yield "".
pub fn project_row(row: &[String], indexes: &[usize]) -> Vec<String> {
    indexes
        .iter()
        .map(|&i| row.get(i).cloned().unwrap_or_default())
        .collect()
}

/// Memoising front-end to [`field_indexes`], scoped to one run.
#[derive(Debug, Default)]
pub struct FieldProjector {
    cache: HashMap<(ProjectionPolicy, Vec<String>), Vec<usize>>,
}

impl FieldProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the retained column indexes, computing them on first sight.
    pub fn project(&mut self, header: &[String], policy: ProjectionPolicy) -> &[usize] {
        self.cache
            .entry((policy, header.to_vec()))
            .or_insert_with(|| {
                let idx = field_indexes(header, policy);
                trace!(policy = policy.as_str(), ?header, ?idx, "computed projection");
                idx
            })
    }

    /// Number of distinct `(policy, header)` pairs seen so far.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hero_skills_keeps_key_name_default_unlock() {
        let header = h(&["Key", "Name", "Might", "Range", "Default", "Unlock"]);
        assert_eq!(field_indexes(&header, ProjectionPolicy::HeroSkills), vec![0, 1, 4, 5]);
    }

    #[test]
    fn hero_skills_degenerates_for_short_headers() {
        assert_eq!(field_indexes(&h(&["Key", "Name"]), ProjectionPolicy::HeroSkills), vec![0, 1]);
        assert_eq!(
            field_indexes(&h(&["Key", "Name", "Unlock"]), ProjectionPolicy::HeroSkills),
            vec![0, 1, 2]
        );
        assert_eq!(field_indexes(&h(&["Key"]), ProjectionPolicy::HeroSkills), vec![0]);
    }

    #[test]
    fn passives_projection_is_by_name() {
        let header = h(&["Key", "Type", "Name", "SP", "Description", "Unlock"]);
        assert_eq!(
            field_indexes(&header, ProjectionPolicy::HeroSkillsPassives),
            vec![0, 2, 3, 5]
        );

        let shuffled = h(&["Key", "unlock", "Description", " sp ", "NAME"]);
        assert_eq!(
            field_indexes(&shuffled, ProjectionPolicy::HeroSkillsPassives),
            vec![0, 1, 3, 4]
        );
    }

    #[test]
    fn passives_projection_omits_missing_fields() {
        let header = h(&["Key", "Type", "Description"]);
        assert_eq!(field_indexes(&header, ProjectionPolicy::HeroSkillsPassives), vec![0]);
    }

    #[test]
    fn skill_projection_strips_join_and_unlock_columns() {
        let header = h(&["Key", "Name", "Might", "Default", "Unlock"]);
        assert_eq!(field_indexes(&header, ProjectionPolicy::Skill), vec![1, 2]);
    }

    #[test]
    fn hero_projection_uses_preference_order() {
        let header = h(&["Key", "Type", "Name", "SP", "Description", "Unlock"]);
        assert_eq!(field_indexes(&header, ProjectionPolicy::Hero), vec![2, 1, 4, 3]);
    }

    #[test]
    fn hero_projection_falls_back_when_nothing_preferred() {
        let header = h(&["Key", "Skill", "Cost", "Unlock"]);
        assert_eq!(field_indexes(&header, ProjectionPolicy::Hero), vec![1, 2]);

        let only_excluded = h(&["Key", "Unlock"]);
        assert_eq!(field_indexes(&only_excluded, ProjectionPolicy::Hero), vec![0, 1]);
    }

    #[test]
    fn identity_keeps_everything() {
        assert_eq!(
            field_indexes(&h(&["a", "b", "c"]), ProjectionPolicy::Identity),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn project_row_pads_short_rows() {
        let row = h(&["Alm", "Falchion"]);
        assert_eq!(project_row(&row, &[0, 1, 3]), h(&["Alm", "Falchion", ""]));
    }

    #[test]
    fn projector_memoises_per_header_and_policy() {
        let mut projector = FieldProjector::new();
        let header = h(&["Key", "Name", "Default", "Unlock"]);
        let first = projector.project(&header, ProjectionPolicy::HeroSkills).to_vec();
        let again = projector.project(&header, ProjectionPolicy::HeroSkills).to_vec();
        assert_eq!(first, again);
        assert_eq!(projector.cached(), 1);

        projector.project(&header, ProjectionPolicy::Skill);
        assert_eq!(projector.cached(), 2);
    }
}
