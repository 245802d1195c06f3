//! Session log: one JSON object per line, one line per processed cycle.
//!
//! Each run gets its own directory named after the local start time:
//!
//! ```text
//! <root>/session_20240131_184502/log.json
//! ```

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use roadsight_pipeline::LogRecord;

use crate::error::IoError;

/// File name of the log inside the session directory.
pub const LOG_FILE_NAME: &str = "log.json";

/// Append-only JSON-lines log for one session.
#[derive(Debug)]
pub struct SessionLog {
    dir: PathBuf,
    path: PathBuf,
    records: usize,
}

impl SessionLog {
    /// Create a session directory under `root` stamped with the current
    /// local time.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::SessionDir`] if the directory cannot be created.
    pub fn create(root: &Path) -> Result<Self, IoError> {
        Self::create_at(root, Local::now())
    }

    /// Like [`create`](Self::create) with an explicit start time.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::SessionDir`] if the directory cannot be created.
    pub fn create_at(root: &Path, started: DateTime<Local>) -> Result<Self, IoError> {
        let dir = root.join(session_dir_name(&started));
        fs::create_dir_all(&dir).map_err(|source| IoError::SessionDir {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(LOG_FILE_NAME);
        log::info!("session log: {}", path.display());
        Ok(Self {
            dir,
            path,
            records: 0,
        })
    }

    /// The session directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended so far.
    #[must_use]
    pub const fn records(&self) -> usize {
        self.records
    }

    /// Append one record as a single JSON line.
    ///
    /// The file is opened in append mode for every record, so earlier
    /// lines survive a crash mid-session.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::LogWrite`]. Nothing is
    /// written if serialization fails.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), IoError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;

        self.records += 1;
        log::debug!(
            "appended record {} ({} bytes) to {}",
            self.records,
            line.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Read every record back from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::LogWrite`] if the file cannot be read and
    /// [`IoError::Serialize`] for a line that is not a valid record.
    pub fn read_records(path: &Path) -> Result<Vec<LogRecord>, IoError> {
        let text = fs::read_to_string(path)?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(IoError::from))
            .collect()
    }
}

/// `session_<YYYYmmdd_HHMMSS>`.
fn session_dir_name(started: &DateTime<Local>) -> String {
    format!("session_{}", started.format("%Y%m%d_%H%M%S"))
}
