use std::cmp::Ordering;

use utils::report::{Report, Series, SeriesStyle};

use crate::{
    config::Config,
    io::{self, CountRecord},
    model::fit_poisson,
};

/// Strategy
///
/// Load the counts table (optionally merged with the target
/// concentrations), fit a Poisson GLM of the counts on all predictors,
/// then quadratic fits of GC content and length individually, logging each
/// fit summary and adding a plot page per model
pub fn process_data(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");
    let mut data = io::read_counts_file(cfg.counts())?;
    let with_target = if let Some(p) = cfg.target() {
        let targets = io::read_target_file(p)?;
        io::merge_target(&mut data, &targets);
        true
    } else {
        false
    };
    if data.is_empty() {
        return Err(anyhow!("No usable count records after loading input"));
    }

    let mut report = Report::new(cfg.report_path(), "Read count bias report");

    global_model(&mut report, &data, with_target)?;
    gc_model(&mut report, &data)?;
    length_model(&mut report, &data)?;

    debug!("Writing report to {}", cfg.report_path().display());
    report.close()?;
    info!("Finished");
    Ok(())
}

/// Fit all predictors on counts
fn global_model(
    report: &mut Report,
    data: &[CountRecord],
    with_target: bool,
) -> anyhow::Result<()> {
    let mut names = vec!["(Intercept)"];
    if with_target {
        names.push("Target");
    }
    names.extend(["Length", "GC", "GC2"]);
    let rows: Vec<Vec<f64>> = data
        .iter()
        .map(|r| {
            let mut v = vec![1.0];
            if with_target {
                v.push(r.target.expect("Missing merged target"));
            }
            v.extend([r.length, r.gc, r.gc * r.gc]);
            v
        })
        .collect();
    let y: Vec<f64> = data.iter().map(|r| r.count).collect();
    let formula = if with_target {
        "Count ~ Target + Length + GC + GC2"
    } else {
        "Count ~ Length + GC + GC2"
    };
    let fit = fit_poisson(&names, &rows, &y)?;
    fit.log_summary(formula);
    report.add_page(
        "Actual vs. predicted read counts",
        "Count",
        "Predicted count",
        &[Series {
            label: "fitted",
            style: SeriesStyle::Points,
            x: &y,
            y: fit.fitted(),
        }],
    )
}

/// Quadratic fit of GC content on counts
fn gc_model(report: &mut Report, data: &[CountRecord]) -> anyhow::Result<()> {
    let (x, y) = sorted_xy(data, |r| r.gc);
    let rows: Vec<Vec<f64>> = x.iter().map(|&g| vec![1.0, g, g * g]).collect();
    let fit = fit_poisson(&["(Intercept)", "GC", "GC2"], &rows, &y)?;
    fit.log_summary("Count ~ GC + GC2");
    report.add_page(
        "GC content vs. read counts",
        "GC content",
        "Count",
        &[
            Series {
                label: "data",
                style: SeriesStyle::Points,
                x: &x,
                y: &y,
            },
            Series {
                label: "Predicted",
                style: SeriesStyle::Line,
                x: &x,
                y: fit.fitted(),
            },
        ],
    )
}

/// Quadratic fit of reference length on counts
fn length_model(report: &mut Report, data: &[CountRecord]) -> anyhow::Result<()> {
    let (x, y) = sorted_xy(data, |r| r.length);
    let rows: Vec<Vec<f64>> = x.iter().map(|&l| vec![1.0, l, l * l]).collect();
    let fit = fit_poisson(&["(Intercept)", "Length", "Length2"], &rows, &y)?;
    fit.log_summary("Count ~ Length + Length2");
    report.add_page(
        "Length vs. read counts",
        "Length",
        "Count",
        &[
            Series {
                label: "data",
                style: SeriesStyle::Points,
                x: &x,
                y: &y,
            },
            Series {
                label: "Predicted",
                style: SeriesStyle::Line,
                x: &x,
                y: fit.fitted(),
            },
        ],
    )
}

/// Predictor and count vectors ordered by increasing predictor value
fn sorted_xy<F: Fn(&CountRecord) -> f64>(data: &[CountRecord], key: F) -> (Vec<f64>, Vec<f64>) {
    let mut ord: Vec<&CountRecord> = data.iter().collect();
    ord.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
    (
        ord.iter().map(|r| key(r)).collect(),
        ord.iter().map(|r| r.count).collect(),
    )
}
