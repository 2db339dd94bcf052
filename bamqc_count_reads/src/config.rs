use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Declared input format.  htslib detects the actual format when opening the
/// file; the flag exists to reject invalid configurations up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFormat {
    Bam,
    Sam,
}

impl FromStr for InFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bam" => Ok(InFormat::Bam),
            "sam" => Ok(InFormat::Sam),
            _ => Err(format!(
                "invalid alignment format '{}' (expected bam or sam)",
                s
            )),
        }
    }
}

impl fmt::Display for InFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InFormat::Bam => write!(f, "bam"),
            InFormat::Sam => write!(f, "sam"),
        }
    }
}

pub struct Config {
    input: PathBuf,
    format: InFormat,
    min_qual: u8,
    fasta: Option<PathBuf>,
    top_per_query: bool,
    output: Option<PathBuf>,
    threads: usize,
}

impl Config {
    pub fn new(input: PathBuf, format: InFormat) -> Self {
        Self {
            input,
            format,
            min_qual: 0,
            fasta: None,
            top_per_query: false,
            output: None,
            threads: 1,
        }
    }

    pub fn set_min_qual(&mut self, q: u8) {
        self.min_qual = q
    }

    pub fn set_fasta(&mut self, p: Option<PathBuf>) {
        self.fasta = p
    }

    pub fn set_top_per_query(&mut self, x: bool) {
        self.top_per_query = x
    }

    pub fn set_output(&mut self, p: Option<PathBuf>) {
        self.output = p
    }

    pub fn set_threads(&mut self, nt: usize) {
        self.threads = nt
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn format(&self) -> InFormat {
        self.format
    }

    pub fn min_qual(&self) -> u8 {
        self.min_qual
    }

    pub fn fasta(&self) -> Option<&Path> {
        self.fasta.as_deref()
    }

    pub fn top_per_query(&self) -> bool {
        self.top_per_query
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing() {
        assert_eq!(InFormat::from_str("bam").unwrap(), InFormat::Bam);
        assert_eq!(InFormat::from_str("SAM").unwrap(), InFormat::Sam);
        assert!(InFormat::from_str("cram").is_err());
    }
}
