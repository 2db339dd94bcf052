use std::{collections::BTreeMap, path::Path};

use anyhow::Context;
use compress_io::compress::CompressIo;
use serde::Serialize;

use crate::aggregate::CoverageCurve;

/// Results written for downstream programmatic consumption.  Curves hold the
/// raw (pre-log) coverage sums.
#[derive(Serialize)]
pub struct CovResults {
    pub tag: String,
    pub global_cov: CoverageCurve,
    pub chrom_covs: BTreeMap<String, CoverageCurve>,
}

impl CovResults {
    pub fn new(tag: String, global_cov: CoverageCurve) -> Self {
        Self {
            tag,
            global_cov,
            chrom_covs: BTreeMap::new(),
        }
    }
}

pub fn dump_results<P: AsRef<Path>>(path: P, res: &CovResults) -> anyhow::Result<()> {
    let path = path.as_ref();
    trace!("Opening results file {} for writing", path.display());
    let wrt = CompressIo::new()
        .path(path)
        .bufwriter()
        .with_context(|| format!("Could not open results file {}", path.display()))?;
    serde_json::to_writer_pretty(wrt, res)
        .with_context(|| format!("Error writing results to {}", path.display()))?;
    Ok(())
}
