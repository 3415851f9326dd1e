use anyhow::{Context, Result, ensure};
use chrono_tz::Tz;
use cramguard_core::{
    BlockSuggestionEngine, DEFAULT_COUNT, IntakeParser, IntakeRules, RuleBasedResolver,
    SuggestionRules, parse_timezone,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::ensure_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub planner: PlannerSection,
    /// Keyword tables for free-text intake.
    pub intake: IntakeRules,
    /// Slot, duration and rationale tables for suggestions.
    pub suggestions: SuggestionRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerSection {
    /// IANA zone used to read the wall clock.
    pub timezone: String,
    pub default_count: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
            default_count: DEFAULT_COUNT,
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Result<Tz> {
        Ok(parse_timezone(&self.planner.timezone)?)
    }

    pub fn parser(&self) -> Result<IntakeParser> {
        IntakeParser::new(self.intake.clone(), RuleBasedResolver::new()).context("[intake] rules")
    }

    pub fn engine(&self) -> Result<BlockSuggestionEngine> {
        BlockSuggestionEngine::new(self.suggestions.clone()).context("[suggestions] rules")
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        ensure!(
            self.planner.default_count >= 1,
            "[planner] default_count must be at least 1"
        );
        self.parser()?;
        self.engine()?;
        Ok(())
    }
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config.toml")
}

/// Missing file means defaults. A file that is present is validated.
pub fn load_config(home: &Path) -> Result<Config> {
    let p = config_path(home);
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", p.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", p.display()))?;
    Ok(cfg)
}

pub fn save_config(home: &Path, cfg: &Config) -> Result<()> {
    ensure_home(home)?;
    let p = config_path(home);
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Write the default config unless one exists. Returns whether a file was written.
pub fn init_config(home: &Path) -> Result<bool> {
    if config_path(home).exists() {
        return Ok(false);
    }
    save_config(home, &Config::default())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_config(dir.path()).unwrap());
        assert!(!init_config(dir.path()).unwrap());
        assert_eq!(load_config(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            config_path(dir.path()),
            r#"
[planner]
timezone = "Europe/Berlin"

[suggestions]
durations = [45, 90]
"#,
        )
        .unwrap();
        let cfg = load_config(dir.path()).unwrap();
        assert_eq!(cfg.planner.timezone, "Europe/Berlin");
        assert_eq!(cfg.planner.default_count, DEFAULT_COUNT);
        assert_eq!(cfg.suggestions.durations, vec![45, 90]);
        assert_eq!(cfg.suggestions.rationales.len(), 10);
        assert_eq!(cfg.intake, IntakeRules::default());
    }

    #[test]
    fn test_quiet_slot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            config_path(dir.path()),
            "[suggestions]\nslots = [\"09:00\", \"23:00\"]\n",
        )
        .unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("quiet window"));
    }

    #[test]
    fn test_bad_timezone_is_rejected() {
        let cfg = Config {
            planner: PlannerSection {
                timezone: "Mars/Olympus".to_string(),
                default_count: 5,
            },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
