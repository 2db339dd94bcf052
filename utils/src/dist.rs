use rand::Rng;
use rand_distr::{Distribution, Gamma};

/// Sample from a truncated gamma distribution by rejection.
/// The distribution is parameterized by its mean and shape; the truncation
/// points, if given, are included in the sample range.
pub fn sample_truncated_gamma<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    shape: f64,
    low: Option<f64>,
    high: Option<f64>,
) -> anyhow::Result<f64> {
    if mean <= 0.0 || shape <= 0.0 {
        return Err(anyhow!(
            "Invalid gamma parameters: mean {}, shape {}",
            mean,
            shape
        ));
    }
    let scale = mean / shape;
    let gamma = Gamma::new(shape, scale)
        .map_err(|e| anyhow!("Could not construct gamma distribution: {}", e))?;
    loop {
        let sample = gamma.sample(rng);
        if let Some(l) = low {
            if sample < l {
                continue;
            }
        }
        if let Some(h) = high {
            if sample > h {
                continue;
            }
        }
        return Ok(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn samples_within_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let x = sample_truncated_gamma(&mut rng, 10.0, 2.0, Some(5.0), Some(15.0)).unwrap();
            assert!((5.0..=15.0).contains(&x));
        }
    }

    #[test]
    fn unbounded_samples_are_positive() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let x = sample_truncated_gamma(&mut rng, 3.0, 1.5, None, None).unwrap();
            assert!(x > 0.0);
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_truncated_gamma(&mut rng, 0.0, 1.0, None, None).is_err());
        assert!(sample_truncated_gamma(&mut rng, 1.0, -2.0, None, None).is_err());
    }
}
