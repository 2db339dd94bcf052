use std::sync::Arc;

use serde::Serialize;

use crate::coverage::RawCoverage;

/// Options controlling the rescaling of per-reference coverage
pub struct CoverageScaling {
    pub bins: Option<usize>,
    pub scale_pos: bool,
    pub scale_cov: bool,
}

impl Default for CoverageScaling {
    fn default() -> Self {
        Self {
            bins: None,
            scale_pos: true,
            scale_cov: false,
        }
    }
}

/// Coverage resampled onto a shared position axis, summed over references.
/// Forward strand values are non-negative; reverse strand values carry a
/// negative sign.  Values are the raw (pre-log) sums.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageCurve {
    pub x: Vec<f64>,
    pub fwd: Vec<f64>,
    pub rev: Vec<f64>,
}

/// Resample the per-reference coverage vectors onto a shared axis of `bins`
/// equally spaced points covering [0,1] and sum over the supplied references.
/// A reference missing from one strand's coverage map contributes nothing to
/// that strand.
pub fn aggregate_coverage(
    chroms: &[(Arc<str>, usize)],
    cov: &RawCoverage,
    opts: &CoverageScaling,
) -> anyhow::Result<CoverageCurve> {
    if chroms.is_empty() {
        return Err(anyhow!("No references supplied for coverage aggregation"));
    }
    // Use the mean reference length as the default number of bins
    let bins = match opts.bins {
        Some(b) => b,
        None => (chroms.iter().map(|(_, l)| *l as f64).sum::<f64>() / chroms.len() as f64)
            .round() as usize,
    };
    if bins < 2 {
        return Err(anyhow!("Invalid bin count {} (must be at least 2)", bins));
    }
    let x: Vec<f64> = (0..bins).map(|i| i as f64 / (bins - 1) as f64).collect();
    let mut fwd = vec![0.0; bins];
    let mut rev = vec![0.0; bins];

    for (name, _) in chroms {
        if let Some(v) = cov.fwd.get(name) {
            let y = scale_ref_coverage(name, v, opts)?;
            for (t, s) in fwd.iter_mut().zip(resample(&x, &y, opts.scale_pos)) {
                *t += s
            }
        }
        if let Some(v) = cov.rev.get(name) {
            let y = scale_ref_coverage(name, v, opts)?;
            // Reverse strand accumulates with negative sign
            for (t, s) in rev.iter_mut().zip(resample(&x, &y, opts.scale_pos)) {
                *t -= s
            }
        }
    }
    Ok(CoverageCurve { x, fwd, rev })
}

/// Convert one reference's raw coverage to float, optionally normalized to
/// unit sum
fn scale_ref_coverage(
    name: &Arc<str>,
    v: &[u32],
    opts: &CoverageScaling,
) -> anyhow::Result<Vec<f64>> {
    if v.len() < 2 {
        return Err(anyhow!(
            "Reference {} is too short ({} bases) for coverage resampling",
            name,
            v.len()
        ));
    }
    let mut y: Vec<f64> = v.iter().map(|&c| c as f64).collect();
    if opts.scale_cov {
        let total: f64 = y.iter().sum();
        if total > 0.0 {
            for z in y.iter_mut() {
                *z /= total
            }
        } else {
            warn!(
                "Zero total coverage for {}: coverage left unnormalized",
                name
            );
        }
    }
    Ok(y)
}

/// Piecewise-linear resampling of `y` onto the target axis, clamping at the
/// ends.  The source axis is 0..n-1, rescaled to [0,1] when `scale_pos` is
/// set.
fn resample(target: &[f64], y: &[f64], scale_pos: bool) -> Vec<f64> {
    let n = y.len();
    let top = (n - 1) as f64;
    let scale = if scale_pos { top } else { 1.0 };
    target
        .iter()
        .map(|&xi| {
            let pos = xi * scale;
            if pos <= 0.0 {
                y[0]
            } else if pos >= top {
                y[n - 1]
            } else {
                let j = pos.floor() as usize;
                let t = pos - j as f64;
                y[j] + t * (y[j + 1] - y[j])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fwd: Vec<(&str, Vec<u32>)>, rev: Vec<(&str, Vec<u32>)>) -> RawCoverage {
        let mut cov = RawCoverage::new();
        for (n, v) in fwd {
            cov.fwd.insert(Arc::from(n), v);
        }
        for (n, v) in rev {
            cov.rev.insert(Arc::from(n), v);
        }
        cov
    }

    fn chroms(refs: &[(&str, usize)]) -> Vec<(Arc<str>, usize)> {
        refs.iter().map(|(n, l)| (Arc::from(*n), *l)).collect()
    }

    #[test]
    fn constant_coverage_is_invariant_under_resampling() {
        let cov = raw(vec![("r1", vec![7; 100])], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 100)]),
            &cov,
            &CoverageScaling {
                bins: Some(37),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(curve.fwd.len(), 37);
        for v in curve.fwd {
            assert!((v - 7.0).abs() < 1e-12);
        }
        for v in curve.rev {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn two_flat_references_sum_to_two() {
        let cov = raw(vec![("r1", vec![1; 100]), ("r2", vec![1; 200])], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 100), ("r2", 200)]),
            &cov,
            &CoverageScaling {
                bins: Some(50),
                ..Default::default()
            },
        )
        .unwrap();
        for v in curve.fwd {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn auto_bins_is_mean_reference_length() {
        let cov = raw(vec![("r1", vec![1; 100]), ("r2", vec![1; 300])], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 100), ("r2", 300)]),
            &cov,
            &CoverageScaling::default(),
        )
        .unwrap();
        assert_eq!(curve.x.len(), 200);
        assert_eq!(curve.fwd.len(), 200);
    }

    #[test]
    fn scale_cov_preserves_unit_mass() {
        let cov = raw(vec![("r1", vec![1; 100])], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 100)]),
            &cov,
            &CoverageScaling {
                bins: Some(80),
                scale_cov: true,
                ..Default::default()
            },
        )
        .unwrap();
        // A flat vector normalized to unit sum resamples to the constant 1/len
        for v in curve.fwd {
            assert!((v - 0.01).abs() < 1e-12);
        }
    }

    #[test]
    fn strand_sign_invariants() {
        let cov = raw(
            vec![("r1", vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9])],
            vec![("r1", vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0])],
        );
        let curve = aggregate_coverage(
            &chroms(&[("r1", 10)]),
            &cov,
            &CoverageScaling {
                bins: Some(20),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(curve.fwd.iter().all(|&v| v >= 0.0));
        assert!(curve.rev.iter().all(|&v| v <= 0.0));
    }

    #[test]
    fn missing_strand_contributes_nothing() {
        let cov = raw(vec![("r1", vec![1; 50])], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 50), ("r2", 50)]),
            &cov,
            &CoverageScaling {
                bins: Some(10),
                ..Default::default()
            },
        )
        .unwrap();
        for v in curve.fwd {
            assert!((v - 1.0).abs() < 1e-12);
        }
        for v in curve.rev {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn interpolation_follows_the_gradient() {
        // Linear ramp 0..10 over 11 bases resampled onto 5 bins
        let cov = raw(vec![("r1", (0..=10).collect())], vec![]);
        let curve = aggregate_coverage(
            &chroms(&[("r1", 11)]),
            &cov,
            &CoverageScaling {
                bins: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
        let expect = [0.0, 2.5, 5.0, 7.5, 10.0];
        for (v, e) in curve.fwd.iter().zip(expect) {
            assert!((v - e).abs() < 1e-12);
        }
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        let cov = raw(vec![("r1", vec![1])], vec![]);
        assert!(aggregate_coverage(
            &chroms(&[("r1", 1)]),
            &cov,
            &CoverageScaling {
                bins: Some(10),
                ..Default::default()
            },
        )
        .is_err());

        let cov = raw(vec![("r1", vec![1; 10])], vec![]);
        assert!(aggregate_coverage(
            &chroms(&[("r1", 10)]),
            &cov,
            &CoverageScaling {
                bins: Some(1),
                ..Default::default()
            },
        )
        .is_err());
        assert!(aggregate_coverage(&[], &cov, &CoverageScaling::default()).is_err());
    }
}
