use crate::error::{NextupError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const NEXTUP_DIR: &str = ".nextup";

pub const RULES_FILE: &str = ".nextup/rules.yaml";
pub const MISSING_LOG_FILE: &str = ".nextup/logs/missing.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn rules_path(root: &Path) -> PathBuf {
    root.join(RULES_FILE)
}

pub fn missing_log_path(root: &Path) -> PathBuf {
    root.join(MISSING_LOG_FILE)
}

// ---------------------------------------------------------------------------
// Rule name validation
// ---------------------------------------------------------------------------

static RULE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn rule_name_re() -> &'static Regex {
    RULE_NAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").expect("rule name pattern is valid")
    })
}

pub fn validate_rule_name(name: &str) -> Result<()> {
    if name.len() > 64 || !rule_name_re().is_match(name) {
        return Err(NextupError::InvalidRuleName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
