//! Append-only access log (bitácora).

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{Local, NaiveDateTime};

use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes one timestamped line per login attempt or significant action.
#[derive(Debug, Clone)]
pub struct AccessLog {
    path: PathBuf,
}

impl AccessLog {
    /// Log writer appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `action` performed by `user`, stamped with the local time.
    pub fn record(&self, user: &str, action: &str) -> Result<()> {
        self.record_at(Local::now().naive_local(), user, action)
    }

    /// Append an entry with an explicit timestamp.
    pub fn record_at(&self, at: NaiveDateTime, user: &str, action: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        writeln!(file, "{}", format_line(at, user, action))
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }

    /// Every line written so far; empty when the log does not exist yet.
    pub fn entries(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(content.lines().map(str::to_string).collect())
    }
}

fn format_line(at: NaiveDateTime, user: &str, action: &str) -> String {
    // keep entries on one line no matter what the user typed
    let user = user.replace(['\n', '\r'], " ");
    let action = action.replace(['\n', '\r'], " ");
    format!("[{}] {}: {}", at.format(TIMESTAMP_FORMAT), user, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn appends_timestamped_lines() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let log = AccessLog::new(dir.path().join("logs").join("bitacora.txt"));
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|day| day.and_hms_opt(9, 30, 0))
            .expect("valid timestamp");

        log.record_at(at, "admin", "LOGIN")?;
        log.record_at(at, "admin", "CREATE VEHICLE V1")?;
        log.record("admin", "LOGOUT")?;

        let entries = log.entries()?;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], "[2024-01-01 09:30:00] admin: LOGIN");
        assert_eq!(entries[1], "[2024-01-01 09:30:00] admin: CREATE VEHICLE V1");
        assert!(entries[2].ends_with("admin: LOGOUT"));
        Ok(())
    }

    #[test]
    fn newlines_cannot_forge_entries() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 2)
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .expect("valid timestamp");
        let line = format_line(at, "eve\n[2024-01-01 00:00:00] admin", "LOGIN FAILED");
        assert!(!line.contains('\n'));
    }
}
