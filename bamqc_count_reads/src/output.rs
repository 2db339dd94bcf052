use std::{collections::BTreeMap, io::Write};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{config::Config, reference::RefFeatures};

/// Write the per-reference counts as TSV, with reference features when a
/// FASTA file was supplied
pub fn write_counts(
    cfg: &Config,
    counts: &BTreeMap<String, u64>,
    features: Option<&BTreeMap<String, RefFeatures>>,
) -> anyhow::Result<()> {
    let mut wrt = CompressIo::new()
        .opt_path(cfg.output())
        .bufwriter()
        .with_context(|| "Failed to open output file")?;

    match features {
        Some(features) => {
            writeln!(wrt, "Reference\tCount\tLength\tGC")?;
            for (name, n) in counts.iter() {
                let ft = features.get(name).ok_or_else(|| {
                    anyhow!(
                        "Reference {} from alignment file not present in reference FASTA",
                        name
                    )
                })?;
                writeln!(wrt, "{}\t{}\t{}\t{:.4}", name, n, ft.length(), ft.gc())?;
            }
        }
        None => {
            writeln!(wrt, "Reference\tCount")?;
            for (name, n) in counts.iter() {
                writeln!(wrt, "{}\t{}", name, n)?;
            }
        }
    }
    Ok(())
}
