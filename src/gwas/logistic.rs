use crate::base::*;
use ndarray::prelude::*;
use ndarray_linalg::{Inverse, Solve};
use statrs::distribution::{ContinuousCDF, Normal};
use std::io::{self, Error, ErrorKind};

const MAX_IRLS_ITERATIONS: usize = 25;
const IRLS_TOLERANCE: f64 = 1e-6;
// Keep fitted probabilities away from 0 and 1 so separated markers do not blow up the weights
const PROBABILITY_CLAMP: f64 = 1e-8;

impl LogisticRegression {
    fn fitted_probabilities(&self) -> Array1<f64> {
        self.x
            .dot(&self.b)
            .map(|eta| {
                let mu = 1.0 / (1.0 + (-eta).exp());
                mu.max(PROBABILITY_CLAMP).min(1.0 - PROBABILITY_CLAMP)
            })
    }

    // X'WX with W the diagonal of binomial variances at the current estimates
    fn information_matrix(&self) -> Array2<f64> {
        let mu = self.fitted_probabilities();
        let mut xw = self.x.clone();
        for (i, mut row) in xw.outer_iter_mut().enumerate() {
            row *= mu[i] * (1.0 - mu[i]);
        }
        self.x.t().dot(&xw)
    }
}

impl Regression for LogisticRegression {
    fn new() -> Self {
        LogisticRegression {
            x: Array2::from_elem((1, 1), f64::NAN),
            y: Array1::from_elem(1, f64::NAN),
            b: Array1::from_elem(1, f64::NAN),
            v_b: Array1::from_elem(1, f64::NAN),
            z: Array1::from_elem(1, f64::NAN),
            pval: Array1::from_elem(1, f64::NAN),
        }
    }

    // Newton-Raphson/IRLS on the binomial log-likelihood
    fn estimate_effects(&mut self) -> io::Result<&mut Self> {
        let (n, p) = self.x.dim();
        let n_ = self.y.len();
        if n != n_ {
            return Err(Error::new(ErrorKind::Other, "The number of samples in the dependent and independent variables are not the same size."));
        }
        if self.y.iter().any(|&y| (y != 0.0) & (y != 1.0)) {
            return Err(Error::new(
                ErrorKind::Other,
                "Logistic regression expects a binary 0/1 phenotype.",
            ));
        }
        self.b = Array1::from_elem(p, 0.0);
        for _ in 0..MAX_IRLS_ITERATIONS {
            let mu = self.fitted_probabilities();
            let gradient = self.x.t().dot(&(&self.y - &mu));
            let information = self.information_matrix();
            let delta = match information.solve(&gradient) {
                Ok(x) => x,
                Err(_) => {
                    return Err(Error::new(
                        ErrorKind::Other,
                        "Non-invertible information matrix",
                    ))
                }
            };
            self.b = &self.b + &delta;
            if delta.iter().fold(0.0_f64, |max, &d| max.max(d.abs())) < IRLS_TOLERANCE {
                break;
            }
        }
        Ok(self)
    }

    // Wald variances from the inverse observed information at the estimates
    fn estimate_variances(&mut self) -> io::Result<&mut Self> {
        if self.b[0].is_nan() {
            self.estimate_effects()?;
        }
        let p = self.x.ncols();
        let vcv = match self.information_matrix().inv() {
            Ok(x) => x,
            Err(_) => {
                return Err(Error::new(
                    ErrorKind::Other,
                    "Non-invertible information matrix",
                ))
            }
        };
        self.v_b = Array1::from_elem(p, f64::NAN);
        for i in 0..p {
            self.v_b[i] = vcv[(i, i)];
        }
        Ok(self)
    }

    fn estimate_significance(&mut self) -> io::Result<&mut Self> {
        if self.b[0].is_nan() {
            self.estimate_effects()?;
        }
        if self.v_b[0].is_nan() {
            self.estimate_variances()?;
        }
        let p = self.x.ncols();
        let d = Normal::new(0.0, 1.0).unwrap();
        self.z = Array1::from_elem(p, f64::NAN);
        self.pval = Array1::from_elem(p, f64::NAN);
        for i in 0..p {
            self.z[i] = self.b[i] / self.v_b[i].sqrt();
            if self.z[i].is_infinite() {
                self.pval[i] = 0.0;
            } else if self.z[i].is_nan() {
                self.pval[i] = 1.0;
            } else {
                self.pval[i] = 2.00 * (1.00 - d.cdf(self.z[i].abs()));
            }
        }
        Ok(self)
    }
}
