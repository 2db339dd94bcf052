use crate::{config::Config, counts, output, reference};

/// Strategy
///
/// Scan the reference FASTA for per-reference features if one was supplied,
/// count mapped reads per reference (after the optional top-per-query
/// filter), then write the merged table
pub fn process_counts(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing; declared input format: {}", cfg.format());

    let features = match cfg.fasta() {
        Some(p) => Some(reference::read_features(p)?),
        None => None,
    };

    let counts = counts::count_reads(cfg)?;
    debug!("Counted reads for {} references", counts.len());

    output::write_counts(cfg, &counts, features.as_ref())?;
    Ok(())
}
