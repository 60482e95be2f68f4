use serde::Deserialize;

/// Which kind of page an entity came from; decides its ledger file and side tables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    #[serde(alias = "heroes", alias = "hero")]
    Primary,
    #[serde(alias = "resplendents", alias = "resplendent")]
    Variant,
    #[serde(alias = "refines")]
    Refine,
    #[serde(alias = "manuals")]
    Manual,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Primary,
        Category::Variant,
        Category::Refine,
        Category::Manual,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Primary => "heroes",
            Category::Variant => "resplendents",
            Category::Refine => "refines",
            Category::Manual => "manuals",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "heroes" | "hero" => Some(Category::Primary),
            "variant" | "resplendents" | "resplendent" => Some(Category::Variant),
            "refine" | "refines" => Some(Category::Refine),
            "manual" | "manuals" => Some(Category::Manual),
            _ => None,
        }
    }

    /// Completion ledger file name, e.g. `heroes.txt`.
    pub fn ledger_file(&self) -> String {
        format!("{}.txt", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_aliases() {
        for cat in Category::ALL {
            assert_eq!(Category::from_str(cat.as_str()), Some(cat));
        }
        assert_eq!(Category::from_str(" Variant "), Some(Category::Variant));
        assert_eq!(Category::from_str("portraits"), None);
    }

    #[test]
    fn deserializes_spec_and_legacy_names() {
        let cats: Vec<Category> =
            serde_json::from_str(r#"["primary","resplendents","refines","manual"]"#).unwrap();
        assert_eq!(
            cats,
            vec![
                Category::Primary,
                Category::Variant,
                Category::Refine,
                Category::Manual
            ]
        );
    }

    #[test]
    fn ledger_files_follow_category_names() {
        assert_eq!(Category::Primary.ledger_file(), "heroes.txt");
        assert_eq!(Category::Refine.ledger_file(), "refines.txt");
    }
}
