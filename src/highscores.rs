//! Persist the best line count to disk (XDG config or ~/.config/rigidtris).

use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

const FILENAME: &str = "top_lines";

/// A stored record older than this reads as absent.
pub const RECORD_RETENTION: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 10);

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no config directory (HOME unset)")]
    NoConfigDir,
}

/// Where the best line count lives between runs.
pub trait RecordStore: fmt::Debug {
    /// Stored best, 0 when there is none.
    fn load(&self) -> u32;
    fn save(&mut self, top_lines: u32) -> Result<(), RecordError>;
}

/// Returns the default record path (config dir / rigidtris / top_lines).
pub fn default_path() -> Result<PathBuf, RecordError> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .map_err(|_| RecordError::NoConfigDir)?,
    };
    Ok(base.join("rigidtris").join(FILENAME))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Parse `"<lines> <saved_at>"`. Missing timestamp counts as fresh.
fn parse_record(content: &str, now: u64) -> u32 {
    let mut fields = content.split_whitespace();
    let Some(lines) = fields.next().and_then(|f| f.parse::<u32>().ok()) else {
        return 0;
    };
    match fields.next().and_then(|f| f.parse::<u64>().ok()) {
        Some(saved_at) if now.saturating_sub(saved_at) > RECORD_RETENTION.as_secs() => 0,
        _ => lines,
    }
}

#[derive(Debug, Clone)]
pub struct FileRecords {
    path: PathBuf,
}

impl FileRecords {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RecordStore for FileRecords {
    fn load(&self) -> u32 {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_record(&content, now_secs()),
            Err(err) => {
                debug!("no record at {}: {err}", self.path.display());
                0
            }
        }
    }

    fn save(&mut self, top_lines: u32) -> Result<(), RecordError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, format!("{} {}\n", top_lines, now_secs()))?;
        Ok(())
    }
}

/// Store that forgets everything on exit, used when no config dir exists.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecords {
    pub top_lines: u32,
    pub saves: u32,
}

impl RecordStore for MemoryRecords {
    fn load(&self) -> u32 {
        self.top_lines
    }

    fn save(&mut self, top_lines: u32) -> Result<(), RecordError> {
        self.top_lines = top_lines;
        self.saves += 1;
        Ok(())
    }
}

/// File store at `path`, or the default location, or memory if neither works.
pub fn open(path: Option<PathBuf>) -> Box<dyn RecordStore> {
    match path.map_or_else(default_path, Ok) {
        Ok(p) => Box::new(FileRecords::new(p)),
        Err(err) => {
            warn!("records will not persist: {err}");
            Box::new(MemoryRecords::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record_fresh() {
        assert_eq!(parse_record("12 1000\n", 2000), 12);
    }

    #[test]
    fn test_parse_record_without_timestamp() {
        assert_eq!(parse_record("7", 5), 7);
    }

    #[test]
    fn test_parse_record_expired() {
        let now = RECORD_RETENTION.as_secs() + 10;
        assert_eq!(parse_record("30 5", now), 0);
    }

    #[test]
    fn test_parse_record_garbage() {
        assert_eq!(parse_record("lots", 0), 0);
        assert_eq!(parse_record("", 0), 0);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("rigidtris-test-{}", std::process::id()));
        let mut store = FileRecords::new(dir.join("nested").join(FILENAME));
        assert_eq!(store.load(), 0);
        store.save(42).unwrap();
        assert_eq!(store.load(), 42);
        let _ = fs::remove_dir_all(dir);
    }
}
