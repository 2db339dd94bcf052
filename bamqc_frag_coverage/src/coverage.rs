use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::Context;
use rust_htslib::bam::{self, Read};

use crate::{config::Config, reference::RefSet};

pub type StrandCov = HashMap<Arc<str>, Vec<u32>>;

/// Raw per-base fragment coverage per reference and strand
pub struct RawCoverage {
    pub fwd: StrandCov,
    pub rev: StrandCov,
}

impl RawCoverage {
    pub fn new() -> Self {
        Self {
            fwd: HashMap::new(),
            rev: HashMap::new(),
        }
    }

    /// Total coverage (both strands) for a reference
    pub fn total(&self, name: &str) -> f64 {
        let sum = |m: &StrandCov| {
            m.get(name)
                .map(|v| v.iter().map(|&x| x as f64).sum::<f64>())
                .unwrap_or(0.0)
        };
        sum(&self.fwd) + sum(&self.rev)
    }
}

/// Read SAM/BAM data from the input file and accumulate per-base coverage
/// for every reference in the reference set
pub fn read_coverage_data(cfg: &Config, refs: &RefSet) -> anyhow::Result<RawCoverage> {
    if let Some(region) = cfg.region() {
        debug!("Scanning alignments for region {}", region);
        let mut rdr = bam::IndexedReader::from_path(cfg.bam()).with_context(|| {
            format!(
                "Could not open alignment file {} for indexed reading",
                cfg.bam().display()
            )
        })?;
        if cfg.threads() > 1 {
            rdr.set_threads(cfg.threads())
                .with_context(|| "Could not set up decompression threads")?;
        }
        rdr.fetch(region)
            .with_context(|| format!("Could not fetch region {}", region))?;
        accumulate(&mut rdr, refs, cfg.min_qual())
    } else {
        debug!("Scanning all alignments from {}", cfg.bam().display());
        let mut rdr = bam::Reader::from_path(cfg.bam())
            .with_context(|| format!("Could not open alignment file {}", cfg.bam().display()))?;
        if cfg.threads() > 1 {
            rdr.set_threads(cfg.threads())
                .with_context(|| "Could not set up decompression threads")?;
        }
        accumulate(&mut rdr, refs, cfg.min_qual())
    }
}

fn accumulate<R: bam::Read>(
    rdr: &mut R,
    refs: &RefSet,
    min_qual: u8,
) -> anyhow::Result<RawCoverage> {
    // Map target ids to shared reference names up front
    let raw_names: Vec<String> = rdr
        .header()
        .target_names()
        .iter()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .collect();
    let tid_names: Vec<Option<Arc<str>>> = raw_names
        .iter()
        .map(|n| refs.get_name(n).map(Arc::clone))
        .collect();

    let mut cov = RawCoverage::new();
    let mut unknown: HashSet<i32> = HashSet::new();
    let mut n_used: u64 = 0;
    let mut rec = bam::Record::new();
    while let Some(r) = rdr.read(&mut rec) {
        r.with_context(|| "Error reading alignment record")?;
        if rec.is_unmapped() || rec.mapq() < min_qual {
            continue;
        }
        let tid = rec.tid();
        if tid < 0 {
            continue;
        }
        let name = match tid_names.get(tid as usize).and_then(|x| x.as_ref()) {
            Some(n) => n,
            None => {
                if unknown.insert(tid) {
                    warn!(
                        "Skipping alignments to {}: not in reference set",
                        raw_names
                            .get(tid as usize)
                            .map(|s| s.as_str())
                            .unwrap_or("unknown target")
                    );
                }
                continue;
            }
        };
        let seq_len = refs.length(name).expect("Missing reference length");
        let start = rec.pos().max(0) as usize;
        // Clamp the alignment end to the reference length
        let end = (rec.cigar().end_pos().max(0) as usize).min(seq_len);
        if end <= start {
            continue;
        }
        let strand = if rec.is_reverse() {
            &mut cov.rev
        } else {
            &mut cov.fwd
        };
        let v = strand
            .entry(Arc::clone(name))
            .or_insert_with(|| vec![0u32; seq_len]);
        for x in &mut v[start..end] {
            *x += 1
        }
        n_used += 1;
    }
    debug!("Accumulated coverage from {} alignments", n_used);
    Ok(cov)
}
