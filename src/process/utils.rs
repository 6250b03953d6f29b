use glob::{glob, Pattern};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CensusError, Result};

static LEADING_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)").unwrap());

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Parse an estimate cell; blanks and placeholders such as `.` are `None`.
pub fn parse_estimate(raw: &str) -> Option<f64> {
    clean_str(raw).parse().ok()
}

/// Parse a whole non-negative number, accepting `"06"` and `"6.0"` alike.
pub fn parse_u32(field: &'static str, raw: &str) -> Result<u32> {
    let cleaned = clean_str(raw);
    if let Ok(v) = cleaned.parse::<u32>() {
        return Ok(v);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) => Ok(v as u32),
        _ => Err(CensusError::parse(field, raw)),
    }
}

/// Leading integer token of fields like `"49 CELLS"`.
pub fn leading_integer(field: &'static str, raw: &str) -> Result<usize> {
    LEADING_INT
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| CensusError::parse(field, raw))
}

/// Find the single file in `dir` whose name matches `file_pattern`.
/// Zero or several matches is an error, never a silent pick.
pub fn resolve_unique(dir: &Path, file_pattern: &str) -> Result<PathBuf> {
    let pattern = format!(
        "{}/{}",
        Pattern::escape(&dir.to_string_lossy()),
        file_pattern
    );
    let matches: Vec<PathBuf> = glob(&pattern)?.filter_map(|e| e.ok()).collect();
    debug!(pattern = %pattern, found = matches.len(), "resolved file pattern");
    match <[PathBuf; 1]>::try_from(matches) {
        Ok([path]) => Ok(path),
        Err(matches) => Err(CensusError::FileResolution {
            pattern,
            found: matches.len(),
        }),
    }
}
