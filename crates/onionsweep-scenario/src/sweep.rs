//! Sweeps: the ordered list of scenario runs and where each one writes.

use crate::config::ScenarioConfig;
use crate::mode::AccessMode;
use crate::space::{generate_latency, generate_publish, generate_retrieve};
use std::path::{Path, PathBuf};

pub const PUBLISH_RUN_DIR: &str = "publish";
/// Historical directory name, kept so existing result trees still resume.
pub const RETRIEVE_RUN_DIR: &str = "retreive";
pub const LATENCY_RUN_DIR_PREFIX: &str = "latency";

/// One scenario run and the directory its output lands in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
    pub run_dir: String,
    pub config: ScenarioConfig,
}

impl SweepEntry {
    pub fn new(run_dir: impl Into<String>, config: impl Into<ScenarioConfig>) -> Self {
        Self {
            run_dir: run_dir.into(),
            config: config.into(),
        }
    }

    /// `<root>/<run_dir>/<id>.json`. Its existence marks the run as done.
    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(&self.run_dir).join(format!("{}.json", self.config.id()))
    }

    pub fn id(&self) -> String {
        self.config.id()
    }
}

pub fn publish_sweep() -> Vec<SweepEntry> {
    generate_publish()
        .into_iter()
        .map(|config| SweepEntry::new(PUBLISH_RUN_DIR, config))
        .collect()
}

pub fn retrieve_sweep() -> Vec<SweepEntry> {
    generate_retrieve()
        .into_iter()
        .map(|config| SweepEntry::new(RETRIEVE_RUN_DIR, config))
        .collect()
}

/// Latency sweep with every config repeated `repetitions` times into
/// `latency0`, `latency1`, ... before moving to the next config.
/// `mode` restricts the sweep to one access mode.
pub fn latency_sweep(repetitions: u32, mode: Option<AccessMode>) -> Vec<SweepEntry> {
    generate_latency()
        .into_iter()
        .filter(|config| mode.map_or(true, |mode| config.mode == mode))
        .flat_map(|config| {
            (0..repetitions).map(move |repetition| {
                SweepEntry::new(format!("{}{}", LATENCY_RUN_DIR_PREFIX, repetition), config)
            })
        })
        .collect()
}
