use std::path::{Path, PathBuf};

pub struct Config {
    bam: PathBuf,
    fasta: PathBuf,
    region: Option<String>,
    bins: Option<usize>,
    per_ref: bool,
    log_scale: bool,
    tag: String,
    min_qual: u8,
    report_path: PathBuf,
    dump_path: PathBuf,
    threads: usize,
}

impl Config {
    pub fn new(
        bam: PathBuf,
        fasta: PathBuf,
        tag: String,
        report_path: PathBuf,
        dump_path: PathBuf,
    ) -> Self {
        Self {
            bam,
            fasta,
            region: None,
            bins: None,
            per_ref: false,
            log_scale: true,
            tag,
            min_qual: 0,
            report_path,
            dump_path,
            threads: 1,
        }
    }

    pub fn set_region(&mut self, region: Option<String>) {
        self.region = region
    }

    pub fn set_bins(&mut self, bins: Option<usize>) {
        self.bins = bins
    }

    pub fn set_per_ref(&mut self, x: bool) {
        self.per_ref = x
    }

    pub fn set_log_scale(&mut self, x: bool) {
        self.log_scale = x
    }

    pub fn set_min_qual(&mut self, q: u8) {
        self.min_qual = q
    }

    pub fn set_threads(&mut self, nt: usize) {
        self.threads = nt
    }

    pub fn bam(&self) -> &Path {
        &self.bam
    }

    pub fn fasta(&self) -> &Path {
        &self.fasta
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn bins(&self) -> Option<usize> {
        self.bins
    }

    pub fn per_ref(&self) -> bool {
        self.per_ref
    }

    pub fn log_scale(&self) -> bool {
        self.log_scale
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn min_qual(&self) -> u8 {
        self.min_qual
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}
