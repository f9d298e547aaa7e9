use directories::ProjectDirs;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::feedback::Thresholds;
use crate::trace_index::{DEFAULT_MAX_DEVIATION_RADIUS, DEFAULT_SCAN_DIAMETER, DEFAULT_SEGMENT_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tolerated deviation from the expert trace, in pixels
    pub max_deviation_radius: f64,
    /// Minimum diameter searched around a query point
    pub scan_diameter: f64,
    pub segment_size: usize,
    /// Sections used for progressive accuracy
    pub sections: usize,
    /// Score both coverage directions on separate threads
    pub parallel: bool,
    /// Sakoe-Chiba band for DTW; `None` computes the full table
    pub dtw_window: Option<usize>,
    pub distance_feedback: Thresholds,
    pub pressure_feedback: Thresholds,
    pub tilt_feedback: Thresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_deviation_radius: DEFAULT_MAX_DEVIATION_RADIUS,
            scan_diameter: DEFAULT_SCAN_DIAMETER,
            segment_size: DEFAULT_SEGMENT_SIZE,
            sections: 10,
            parallel: true,
            dtw_window: None,
            distance_feedback: Thresholds {
                low_start: 0.0,
                low_cutoff: 0.0,
                high_start: DEFAULT_MAX_DEVIATION_RADIUS,
                high_cutoff: 4.0 * DEFAULT_MAX_DEVIATION_RADIUS,
            },
            pressure_feedback: Thresholds {
                low_start: 0.1,
                low_cutoff: 0.4,
                high_start: 0.1,
                high_cutoff: 0.4,
            },
            tilt_feedback: Thresholds {
                low_start: 5.0,
                low_cutoff: 20.0,
                high_start: 5.0,
                high_cutoff: 20.0,
            },
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "quill") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("quill_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => warn!("ignoring unreadable config {}: {}", self.path.display(), e),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::from)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            max_deviation_radius: 2.5,
            scan_diameter: 40.0,
            segment_size: 32,
            sections: 4,
            parallel: false,
            dtw_window: Some(8),
            ..Config::default()
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"max_deviation_radius": 12.0}"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.max_deviation_radius, 12.0);
        assert_eq!(cfg.segment_size, DEFAULT_SEGMENT_SIZE);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }
}
