use std::path::{Path, PathBuf};

pub struct Config {
    counts: PathBuf,
    target: Option<PathBuf>,
    report_path: PathBuf,
}

impl Config {
    pub fn new(counts: PathBuf, report_path: PathBuf) -> Self {
        Self {
            counts,
            target: None,
            report_path,
        }
    }

    pub fn set_target(&mut self, p: Option<PathBuf>) {
        self.target = p
    }

    pub fn counts(&self) -> &Path {
        &self.counts
    }

    pub fn target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }
}
