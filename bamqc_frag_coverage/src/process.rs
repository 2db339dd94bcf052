use std::{cmp::Ordering, sync::Arc};

use utils::report::{Report, Series, SeriesStyle};

use crate::{
    aggregate::{aggregate_coverage, CoverageCurve, CoverageScaling},
    config::Config,
    coverage::read_coverage_data,
    reference::RefSet,
    results::{dump_results, CovResults},
};

/// Strategy
///
/// Scan the reference FASTA for sequence lengths, then scan the alignment
/// file accumulating per-base coverage per reference and strand.  The raw
/// vectors are resampled onto a common axis and summed into a global curve;
/// per-reference curves are added on request, ordered by total coverage.
/// The plots go into the report and the raw curves into the results dump.
pub fn process_coverage(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");
    let refs = RefSet::from_fasta(cfg.fasta())?;
    if refs.is_empty() {
        return Err(anyhow!(
            "No references found in {}",
            cfg.fasta().display()
        ));
    }
    let cov = read_coverage_data(cfg, &refs)?;

    let mut report = Report::new(
        cfg.report_path(),
        format!("Fragment coverage report for {}", cfg.tag()),
    );

    let chroms: Vec<(Arc<str>, usize)> = refs.iter().map(|(n, l)| (Arc::clone(n), l)).collect();

    debug!("Aggregating global coverage curve");
    let global = aggregate_coverage(
        &chroms,
        &cov,
        &CoverageScaling {
            bins: cfg.bins(),
            ..Default::default()
        },
    )?;
    plot_curve(
        &mut report,
        &global,
        cfg.log_scale(),
        &format!("Global fragment coverage for {}", cfg.tag()),
    )?;

    let mut res = CovResults::new(cfg.tag().to_owned(), global);

    if cfg.per_ref() {
        // Plot references in order of decreasing total coverage
        let mut order: Vec<(Arc<str>, usize, f64)> = chroms
            .iter()
            .map(|(n, l)| (Arc::clone(n), *l, cov.total(n)))
            .collect();
        order.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        debug!("Plotting per-reference coverage for {} references", order.len());
        for (name, len, total) in order {
            if total <= 0.0 {
                warn!("Skipping {}: no coverage", name);
                continue;
            }
            let curve = aggregate_coverage(
                &[(Arc::clone(&name), len)],
                &cov,
                &CoverageScaling {
                    bins: Some(len),
                    ..Default::default()
                },
            )?;
            plot_curve(
                &mut report,
                &curve,
                cfg.log_scale(),
                &format!("Fragment coverage for {}:{}", cfg.tag(), name),
            )?;
            res.chrom_covs.insert(name.to_string(), curve);
        }
    }

    debug!("Writing report to {}", cfg.report_path().display());
    report.close()?;
    debug!("Writing results to {}", cfg.dump_path().display());
    dump_results(cfg.dump_path(), &res)?;
    info!("Finished");
    Ok(())
}

/// Add one coverage page to the report.  With log scaling on, the plotted
/// forward curve is ln(fwd) and the reverse curve -ln(-rev); the raw sums in
/// the curve itself are untouched.
fn plot_curve(
    report: &mut Report,
    curve: &CoverageCurve,
    log_scale: bool,
    title: &str,
) -> anyhow::Result<()> {
    let fwd = strand_display(&curve.fwd, false, log_scale, title)?;
    let rev = strand_display(&curve.rev, true, log_scale, title)?;
    let mut series = Vec::new();
    if let Some(y) = fwd.as_ref() {
        series.push(Series {
            label: "+",
            style: SeriesStyle::Line,
            x: &curve.x,
            y,
        })
    }
    if let Some(y) = rev.as_ref() {
        series.push(Series {
            label: "-",
            style: SeriesStyle::Line,
            x: &curve.x,
            y,
        })
    }
    if series.is_empty() {
        warn!("Skipping page '{}': no coverage on either strand", title);
        return Ok(());
    }
    let ylab = if log_scale {
        "log(Fragment coverage)"
    } else {
        "Fragment coverage"
    };
    report.add_page(title, "Scaled position", ylab, &series)
}

/// Transform one strand's summed coverage for display.  Returns None for a
/// strand with no coverage at all (nothing to plot); errors on a mix of
/// zero and positive bins, which would otherwise produce infinities.
fn strand_display(
    y: &[f64],
    reverse: bool,
    log_scale: bool,
    title: &str,
) -> anyhow::Result<Option<Vec<f64>>> {
    if !log_scale {
        return Ok(Some(y.to_vec()));
    }
    if y.iter().all(|&v| v == 0.0) {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(y.len());
    for (i, &v) in y.iter().enumerate() {
        let w = if reverse { -v } else { v };
        if w <= 0.0 {
            return Err(anyhow!(
                "Cannot log scale {} strand coverage for '{}': non-positive value {} at bin {} (use -o to disable log scaling)",
                if reverse { "-" } else { "+" },
                title,
                v,
                i
            ));
        }
        out.push(if reverse { -w.ln() } else { w.ln() });
    }
    Ok(Some(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_display_inverts_the_strand_sign() {
        let y = [-1.0, -std::f64::consts::E];
        let out = strand_display(&y, true, true, "t").unwrap().unwrap();
        assert!((out[0] - 0.0).abs() < 1e-12);
        assert!((out[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_strand_is_skipped_not_fatal() {
        let y = [0.0, 0.0, 0.0];
        assert!(strand_display(&y, false, true, "t").unwrap().is_none());
    }

    #[test]
    fn partial_zero_coverage_is_rejected() {
        let y = [1.0, 0.0, 2.0];
        assert!(strand_display(&y, false, true, "t").is_err());
    }

    #[test]
    fn raw_display_passes_values_through() {
        let y = [0.0, 3.0];
        assert_eq!(strand_display(&y, false, false, "t").unwrap().unwrap(), y);
    }
}
