use utils::pnorm;

const MAX_ITER: usize = 50;

// Accumulate weighted least squares equations for one IRLS step.
// X is an n x p design matrix; W and Z are n x 1 vectors.
// X'WX is symmetric so we calculate just the (packed) lower triangle.
struct Accum {
    p: usize,
    xwx: Vec<f64>,
    xwz: Vec<f64>,
}

#[inline]
fn ix(i: usize, j: usize) -> usize {
    i * (i + 1) / 2 + j
}

impl Accum {
    fn new(p: usize) -> Self {
        Self {
            p,
            xwx: vec![0.0; p * (p + 1) / 2],
            xwz: vec![0.0; p],
        }
    }

    // Accumulate contribution of one observation to the LS matrices
    fn accum(&mut self, row: &[f64], w: f64, z: f64) {
        for i in 0..self.p {
            let wi = w * row[i];
            self.xwz[i] += wi * z;
            let base = i * (i + 1) / 2;
            for j in 0..=i {
                self.xwx[base + j] += wi * row[j];
            }
        }
    }

    // Calculate Cholesky decomposition of X'WX matrix
    // Decomposition stored in place
    fn chol(&mut self) -> anyhow::Result<()> {
        let x = &mut self.xwx;
        for i in 0..self.p {
            for j in 0..=i {
                let mut s = x[ix(i, j)];
                for k in 0..j {
                    s -= x[ix(i, k)] * x[ix(j, k)];
                }
                if i == j {
                    if s <= 0.0 {
                        return Err(anyhow!("Weighted design matrix is not positive definite"));
                    }
                    x[ix(i, i)] = s.sqrt();
                } else {
                    x[ix(i, j)] = s / x[ix(j, j)];
                }
            }
        }
        Ok(())
    }

    // Solve X'WX b = X'WZ via forward and back substitution on the factor
    fn solve(&mut self, beta: &mut [f64]) -> anyhow::Result<()> {
        self.chol()?;
        let p = self.p;
        let l = &self.xwx;
        let mut a = vec![0.0; p];
        for i in 0..p {
            let mut s = self.xwz[i];
            for k in 0..i {
                s -= l[ix(i, k)] * a[k];
            }
            a[i] = s / l[ix(i, i)];
        }
        for i in (0..p).rev() {
            let mut s = a[i];
            for k in i + 1..p {
                s -= l[ix(k, i)] * beta[k];
            }
            beta[i] = s / l[ix(i, i)];
        }
        Ok(())
    }

    // Diagonal of (X'WX)^-1 from the Cholesky factor: column j of L^-1
    // gives element (j,j) of the inverse as its squared norm
    fn inverse_diag(&self) -> Vec<f64> {
        let p = self.p;
        let l = &self.xwx;
        let mut diag = vec![0.0; p];
        let mut m = vec![0.0; p];
        for j in 0..p {
            for i in j..p {
                let mut s = if i == j { 1.0 } else { 0.0 };
                for k in j..i {
                    s -= l[ix(i, k)] * m[k];
                }
                m[i] = s / l[ix(i, i)];
                diag[j] += m[i] * m[i];
            }
        }
        diag
    }
}

fn dot(row: &[f64], beta: &[f64]) -> f64 {
    row.iter().zip(beta).map(|(x, b)| x * b).sum()
}

fn poisson_deviance(y: &[f64], eta: &[f64]) -> f64 {
    2.0 * y
        .iter()
        .zip(eta)
        .map(|(&yi, &ei)| {
            let mu = ei.exp();
            let a = if yi > 0.0 { yi * (yi / mu).ln() } else { 0.0 };
            a - (yi - mu)
        })
        .sum::<f64>()
}

/// Fitted Poisson GLM (log link)
pub struct GlmFit {
    names: Vec<String>,
    beta: Vec<f64>,
    se: Vec<f64>,
    fitted: Vec<f64>,
    deviance: f64,
    null_deviance: f64,
    iterations: usize,
}

impl GlmFit {
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    pub fn se(&self) -> &[f64] {
        &self.se
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fitted
    }

    pub fn deviance(&self) -> f64 {
        self.deviance
    }

    pub fn null_deviance(&self) -> f64 {
        self.null_deviance
    }

    /// Log the coefficient table and fit statistics
    pub fn log_summary(&self, formula: &str) {
        info!("Fitted Poisson GLM: {} ({} iterations)", formula, self.iterations);
        info!(
            "{:>12} {:>12} {:>10} {:>8} {:>10}",
            "coef", "estimate", "std err", "z", "P>|z|"
        );
        for ((name, b), s) in self.names.iter().zip(&self.beta).zip(&self.se) {
            let z = b / s;
            let p = 2.0 * pnorm(-z.abs());
            info!(
                "{:>12} {:>12.5} {:>10.5} {:>8.3} {:>10.3e}",
                name, b, s, z, p
            );
        }
        info!(
            "Deviance: {:.4}; null deviance: {:.4}; null/deviance ratio: {:.4}",
            self.deviance,
            self.null_deviance,
            self.null_deviance / self.deviance
        );
    }
}

/// Fit a Poisson GLM with log link by iteratively reweighted least squares.
/// `rows` holds the design matrix including the intercept column; `names`
/// labels its columns.
pub fn fit_poisson(names: &[&str], rows: &[Vec<f64>], y: &[f64]) -> anyhow::Result<GlmFit> {
    let n = y.len();
    let p = names.len();
    if rows.len() != n {
        return Err(anyhow!(
            "Design matrix has {} rows for {} observations",
            rows.len(),
            n
        ));
    }
    if n <= p {
        return Err(anyhow!(
            "Not enough observations ({}) to fit {} coefficients",
            n,
            p
        ));
    }
    if let Some(bad) = rows.iter().find(|r| r.len() != p) {
        return Err(anyhow!(
            "Design row has {} columns, expected {}",
            bad.len(),
            p
        ));
    }
    if y.iter().any(|&v| v < 0.0) {
        return Err(anyhow!("Negative counts in Poisson fit"));
    }

    let mut eta: Vec<f64> = y.iter().map(|&v| (v + 0.5).ln()).collect();
    let mut beta = vec![0.0; p];
    let mut dev = f64::INFINITY;
    let mut iterations = 0;
    loop {
        iterations += 1;
        let mut acc = Accum::new(p);
        for (row, (&yi, &ei)) in rows.iter().zip(y.iter().zip(eta.iter())) {
            let mu = ei.exp();
            let z = ei + (yi - mu) / mu;
            acc.accum(row, mu, z);
        }
        acc.solve(&mut beta)?;
        for (e, row) in eta.iter_mut().zip(rows.iter()) {
            *e = dot(row, &beta);
        }
        let new_dev = poisson_deviance(y, &eta);
        if !new_dev.is_finite() {
            return Err(anyhow!("Poisson fit diverged after {} iterations", iterations));
        }
        if (dev - new_dev).abs() <= 1e-8 * (new_dev.abs() + 0.1) {
            dev = new_dev;
            break;
        }
        dev = new_dev;
        if iterations >= MAX_ITER {
            warn!("IRLS did not converge after {} iterations", MAX_ITER);
            break;
        }
    }

    // Covariance of the estimates from the information matrix at convergence
    let mut acc = Accum::new(p);
    for (row, &ei) in rows.iter().zip(eta.iter()) {
        acc.accum(row, ei.exp(), 0.0);
    }
    acc.chol()?;
    let se: Vec<f64> = acc.inverse_diag().iter().map(|v| v.sqrt()).collect();

    let fitted: Vec<f64> = eta.iter().map(|e| e.exp()).collect();
    let ybar = y.iter().sum::<f64>() / n as f64;
    let null_eta = vec![ybar.ln(); n];
    let null_deviance = poisson_deviance(y, &null_eta);

    Ok(GlmFit {
        names: names.iter().map(|s| s.to_string()).collect(),
        beta,
        se,
        fitted,
        deviance: dev,
        null_deviance,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_log_linear_data() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.5).collect();
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v]).collect();
        let y: Vec<f64> = x.iter().map(|&v| (0.5 + 0.3 * v).exp()).collect();
        let fit = fit_poisson(&["(Intercept)", "x"], &rows, &y).unwrap();
        assert!((fit.beta()[0] - 0.5).abs() < 1e-6);
        assert!((fit.beta()[1] - 0.3).abs() < 1e-6);
        assert!(fit.deviance() < 1e-8);
        assert!(fit.null_deviance() > fit.deviance());
        assert!(fit.se().iter().all(|&s| s.is_finite() && s > 0.0));
    }

    #[test]
    fn recovers_quadratic_coefficients() {
        let x: Vec<f64> = (1..40).map(|i| i as f64 * 0.1).collect();
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v, v * v]).collect();
        let y: Vec<f64> = x.iter().map(|&v| (1.0 + 0.8 * v - 0.2 * v * v).exp()).collect();
        let fit = fit_poisson(&["(Intercept)", "x", "x2"], &rows, &y).unwrap();
        assert!((fit.beta()[0] - 1.0).abs() < 1e-5);
        assert!((fit.beta()[1] - 0.8).abs() < 1e-5);
        assert!((fit.beta()[2] + 0.2).abs() < 1e-5);
    }

    #[test]
    fn fitted_values_match_observations_on_exact_data() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.3).collect();
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v]).collect();
        let y: Vec<f64> = x.iter().map(|&v| (1.2 - 0.1 * v).exp()).collect();
        let fit = fit_poisson(&["(Intercept)", "x"], &rows, &y).unwrap();
        for (f, yi) in fit.fitted().iter().zip(&y) {
            assert!((f - yi).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let rows = vec![vec![1.0, 2.0]];
        let y = vec![1.0];
        assert!(fit_poisson(&["(Intercept)", "x"], &rows, &y).is_err());

        let rows = vec![vec![1.0], vec![1.0], vec![1.0]];
        let y = vec![1.0, -2.0, 3.0];
        assert!(fit_poisson(&["(Intercept)"], &rows, &y).is_err());
    }

    #[test]
    fn singular_design_is_rejected() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v, 0.0]).collect();
        let y: Vec<f64> = x.iter().map(|&v| (0.1 * v).exp()).collect();
        assert!(fit_poisson(&["(Intercept)", "x", "zero"], &rows, &y).is_err());
    }
}
