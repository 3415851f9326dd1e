use anyhow::{Context, Result};
use cramguard_core::PlannerBoard;
use std::fs;
use std::path::{Path, PathBuf};

/// `$CRAMGUARD_HOME` if set, otherwise `~/.cramguard`.
pub fn cramguard_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CRAMGUARD_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cramguard"))
}

pub fn ensure_home(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

pub fn board_path(home: &Path) -> PathBuf {
    home.join("board.json")
}

/// A missing board file is an empty board.
pub fn load_board(home: &Path) -> Result<PlannerBoard> {
    let p = board_path(home);
    if !p.exists() {
        return Ok(PlannerBoard::new());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    serde_json::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_board(home: &Path, board: &PlannerBoard) -> Result<()> {
    ensure_home(home)?;
    let p = board_path(home);
    let json = serde_json::to_string_pretty(board).context("serialize board")?;
    fs::write(&p, json).with_context(|| format!("write {}", p.display()))?;
    tracing::debug!(path = %p.display(), "board saved");
    Ok(())
}
