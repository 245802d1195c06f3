//! PNG previews of the three display frames.

use std::fs;
use std::path::{Path, PathBuf};

use roadsight_pipeline::{DisplayData, Frame};

use crate::error::IoError;

/// Writes `original.png`, `noisy.png` and `restored.png` for each cycle.
#[derive(Debug, Clone)]
pub struct PreviewWriter {
    dir: PathBuf,
    per_cycle: bool,
}

impl PreviewWriter {
    /// Previews go straight into `dir`, overwritten every cycle.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            per_cycle: false,
        }
    }

    /// Keep every cycle's previews in its own `cycle_NNNN` subdirectory.
    #[must_use]
    pub const fn per_cycle(mut self, per_cycle: bool) -> Self {
        self.per_cycle = per_cycle;
        self
    }

    /// Directory previews of `cycle` are written to.
    #[must_use]
    pub fn cycle_dir(&self, cycle: usize) -> PathBuf {
        if self.per_cycle {
            self.dir.join(format!("cycle_{cycle:04}"))
        } else {
            self.dir.clone()
        }
    }

    /// Write the three previews of `display`. Returns the paths written.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Preview`] if the directory cannot be created or an
    /// image cannot be encoded or written.
    pub fn write(&self, cycle: usize, display: &DisplayData) -> Result<[PathBuf; 3], IoError> {
        let dir = self.cycle_dir(cycle);
        fs::create_dir_all(&dir).map_err(|e| IoError::Preview {
            path: dir.clone(),
            source: image::ImageError::IoError(e),
        })?;
        Ok([
            save(&dir, "original.png", &display.original)?,
            save(&dir, "noisy.png", &display.noisy)?,
            save(&dir, "restored.png", &display.restored)?,
        ])
    }
}

fn save(dir: &Path, name: &str, frame: &Frame) -> Result<PathBuf, IoError> {
    let path = dir.join(name);
    frame.save(&path).map_err(|source| IoError::Preview {
        path: path.clone(),
        source,
    })?;
    log::debug!("wrote preview {}", path.display());
    Ok(path)
}
