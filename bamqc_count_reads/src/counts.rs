use std::collections::BTreeMap;

use anyhow::Context;
use rust_htslib::bam::{self, Read};

use crate::{config::Config, filter::TopPerQuery};

/// Count mapped reads per reference, optionally keeping only the top-scoring
/// alignment per query first
pub fn count_reads(cfg: &Config) -> anyhow::Result<BTreeMap<String, u64>> {
    let mut rdr = bam::Reader::from_path(cfg.input())
        .with_context(|| format!("Could not open alignment file {}", cfg.input().display()))?;
    if cfg.threads() > 1 {
        rdr.set_threads(cfg.threads())
            .with_context(|| "Could not set up decompression threads")?;
    }
    let names: Vec<String> = rdr
        .header()
        .target_names()
        .iter()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .collect();

    let mut counts = BTreeMap::new();
    let min_qual = cfg.min_qual();
    if cfg.top_per_query() {
        debug!("Keeping only the top-scoring alignment per query");
        let records = rdr.records().map(|r| r.map_err(anyhow::Error::from));
        for rec in TopPerQuery::new(records) {
            tally(&rec?, &names, min_qual, &mut counts);
        }
    } else {
        let mut rec = bam::Record::new();
        while let Some(r) = rdr.read(&mut rec) {
            r.with_context(|| "Error reading alignment record")?;
            tally(&rec, &names, min_qual, &mut counts);
        }
    }
    Ok(counts)
}

fn tally(rec: &bam::Record, names: &[String], min_qual: u8, counts: &mut BTreeMap<String, u64>) {
    if rec.is_unmapped() || rec.mapq() < min_qual {
        return;
    }
    let tid = rec.tid();
    if tid < 0 {
        return;
    }
    if let Some(name) = names.get(tid as usize) {
        *counts.entry(name.clone()).or_insert(0) += 1;
    }
}
