use std::{collections::BTreeMap, io::BufRead, path::Path};

use anyhow::Context;
use compress_io::compress::CompressIo;

// Base classification: 0 = other, 1 = A/T, 2 = G/C (upper and lower case)
const MTAB: [usize; 256] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 0, 2, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 1, 0, 2, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Sequence length and GC fraction for one reference
pub struct RefFeatures {
    length: usize,
    gc: f64,
}

impl RefFeatures {
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn gc(&self) -> f64 {
        self.gc
    }
}

struct FeatureBuilder {
    counts: [u64; 3],
    length: usize,
}

impl FeatureBuilder {
    fn new() -> Self {
        Self {
            counts: [0; 3],
            length: 0,
        }
    }

    fn add_str(&mut self, s: &str) {
        for c in s.as_bytes() {
            self.counts[MTAB[*c as usize]] += 1;
            self.length += 1;
        }
    }

    // GC fraction over unambiguous bases
    fn features(self) -> RefFeatures {
        let at = self.counts[1];
        let gc = self.counts[2];
        let tot = at + gc;
        RefFeatures {
            length: self.length,
            gc: if tot > 0 {
                gc as f64 / tot as f64
            } else {
                0.0
            },
        }
    }
}

/// Read in next line.
fn get_next_line<R: BufRead>(rdr: &mut R, buf: &mut String) -> anyhow::Result<bool> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(false)
    } else {
        Ok(true)
    }
}

/// Scan a FASTA file collecting length and GC fraction for every sequence
pub fn read_features<S: AsRef<Path>>(fname: S) -> anyhow::Result<BTreeMap<String, RefFeatures>> {
    let fname = fname.as_ref();
    debug!("Reading reference features from {}", fname.display());

    trace!("Opening reference file for reading");
    let mut rdr = CompressIo::new()
        .path(fname)
        .bufreader()
        .with_context(|| format!("Error opening reference file {}", fname.display()))?;

    trace!("Reading from reference file");
    let mut buf = String::new();
    let mut line = 0;
    let mut features = BTreeMap::new();
    let mut current: Option<(String, FeatureBuilder)> = None;
    while get_next_line(&mut rdr, &mut buf)
        .with_context(|| format!("Error after reading {} lines from {}", line, fname.display()))?
    {
        line += 1;
        if buf.starts_with('>') {
            // New reference
            if let Some((name, b)) = current.take() {
                features.insert(name, b.features());
            }
            if let Some(name) = buf.trim_start_matches('>').split_ascii_whitespace().next() {
                trace!("Processing reference {}", name);
                current = Some((name.to_owned(), FeatureBuilder::new()));
            } else {
                return Err(anyhow!("Missing reference name at line {}", line));
            }
        } else if let Some((_, b)) = current.as_mut() {
            b.add_str(buf.trim_end())
        }
    }
    if let Some((name, b)) = current.take() {
        features.insert(name, b.features());
    }
    debug!(
        "Finished reading in {} lines; found {} references",
        line,
        features.len()
    );
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn lengths_and_gc_from_fasta() {
        let mut p = std::env::temp_dir();
        p.push("count_reads_features_test.fa");
        let mut f = std::fs::File::create(&p).unwrap();
        f.write_all(b">ref1 first\nACGT\nacgt\n>ref2\nGGGG\nNNAT\n")
            .unwrap();
        drop(f);

        let features = read_features(&p).unwrap();
        assert_eq!(features.len(), 2);
        let r1 = &features["ref1"];
        assert_eq!(r1.length(), 8);
        assert!((r1.gc() - 0.5).abs() < 1e-12);
        // ref2: 4 G + 2 N + A + T -> length 8, GC 4 of 6 unambiguous
        let r2 = &features["ref2"];
        assert_eq!(r2.length(), 8);
        assert!((r2.gc() - 4.0 / 6.0).abs() < 1e-12);
        std::fs::remove_file(&p).ok();
    }
}
