use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const ENV_DATA_DIR: &str = "HEROSCRAPER_DATA_DIR";
pub const ENV_INPUT: &str = "HEROSCRAPER_INPUT";

/// Run settings. Every field has a default, so an empty YAML file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the CSV files and ledgers live.
    pub data_dir: PathBuf,
    /// Glob matching the raw entity JSON files.
    pub input: String,
    /// Also write the full display tables under `tables/`.
    pub write_tables: bool,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("database"),
            input: "raw/**/*.json".to_string(),
            write_tables: true,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text).context("parsing config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// Defaults, or the YAML file at `path` when given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Apply `HEROSCRAPER_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup; blank values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(input) = lookup(ENV_INPUT).filter(|v| !v.trim().is_empty()) {
            self.input = input;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            bail!("`data_dir` must not be empty");
        }
        if self.input.trim().is_empty() {
            bail!("`input` glob must not be empty");
        }
        glob::Pattern::new(&self.input)
            .with_context(|| format!("invalid `input` glob {:?}", self.input))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn empty_yaml_gives_defaults() -> Result<()> {
        assert_eq!(Config::from_yaml("{}")?, Config::default());
        Ok(())
    }

    #[test]
    fn yaml_fields_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("heroscraper.yaml");
        fs::write(&path, "data_dir: out\nwrite_tables: false\n")?;
        let cfg = Config::load(&path)?;
        assert_eq!(cfg.data_dir, PathBuf::from("out"));
        assert!(!cfg.write_tables);
        assert_eq!(cfg.input, "raw/**/*.json");
        Ok(())
    }

    #[test]
    fn env_overrides_win_over_file() -> Result<()> {
        let vars: HashMap<&str, &str> = [(ENV_DATA_DIR, "elsewhere"), (ENV_INPUT, "  ")].into();
        let cfg = Config::default().with_overrides(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(cfg.data_dir, PathBuf::from("elsewhere"));
        assert_eq!(cfg.input, "raw/**/*.json");
        Ok(())
    }

    #[test]
    fn bad_glob_is_rejected() {
        assert!(Config::from_yaml("input: \"raw/[\"").is_err());
        assert!(Config::from_yaml("data_dir: \"\"").is_err());
    }
}
