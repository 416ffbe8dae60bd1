use crate::base::*;
use ndarray::prelude::*;
use ndarray_linalg::Inverse;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::io::{self, Error, ErrorKind};

impl Regression for LinearRegression {
    fn new() -> Self {
        LinearRegression {
            x: Array2::from_elem((1, 1), f64::NAN),
            y: Array1::from_elem(1, f64::NAN),
            b: Array1::from_elem(1, f64::NAN),
            e: Array1::from_elem(1, f64::NAN),
            ve: f64::NAN,
            v_b: Array1::from_elem(1, f64::NAN),
            t: Array1::from_elem(1, f64::NAN),
            pval: Array1::from_elem(1, f64::NAN),
        }
    }

    fn estimate_effects(&mut self) -> io::Result<&mut Self> {
        let (n, p) = self.x.dim();
        let n_ = self.y.len();
        if n != n_ {
            return Err(Error::new(ErrorKind::Other, "The number of samples in the dependent and independent variables are not the same size."));
        }
        if n <= p {
            return Err(Error::new(
                ErrorKind::Other,
                "The per-marker regression needs more samples than predictors.",
            ));
        }
        let xt = self.x.t();
        let inv_xtx = match (xt.dot(&self.x)).inv() {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "Non-invertible x_matrix")),
        };
        self.b = inv_xtx.dot(&xt).dot(&self.y);
        Ok(self)
    }

    fn estimate_variances(&mut self) -> io::Result<&mut Self> {
        if self.b[0].is_nan() {
            self.estimate_effects()?;
        }
        let (n, p) = self.x.dim();
        self.e = &self.y - &self.x.dot(&self.b);
        self.ve = self.e.iter().fold(0.0, |sum, &x| sum + x.powf(2.0)) / (n as f64 - p as f64);
        let xt = self.x.t();
        let inv_xtx = match (xt.dot(&self.x)).inv() {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "Non-invertible x_matrix")),
        };
        let vcv = inv_xtx.map(|x| self.ve * x);
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
        let (n, p) = self.x.dim();
        let d = StudentsT::new(0.0, 1.0, n as f64 - p as f64).unwrap();
        self.t = Array1::from_elem(p, f64::NAN);
        self.pval = Array1::from_elem(p, f64::NAN);
        for i in 0..p {
            self.t[i] = self.b[i] / self.v_b[i].sqrt();
            if self.t[i].is_infinite() {
                self.pval[i] = 0.0;
            } else if self.t[i].is_nan() {
                self.pval[i] = 1.0;
            } else {
                self.pval[i] = 2.00 * (1.00 - d.cdf(self.t[i].abs()));
            }
        }
        Ok(self)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_regression() {
        // y = 1 + 2x with a little noise
        let x: Array2<f64> = Array2::from_shape_vec(
            (5, 2),
            vec![1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0, 4.0],
        )
        .unwrap();
        let y = Array1::from_vec(vec![1.1, 2.9, 5.1, 6.9, 9.0]);
        let mut regression = LinearRegression::new();
        regression.x = x;
        regression.y = y;
        regression.estimate_significance().unwrap();
        assert_eq!((regression.b[0] * 10.0).round() / 10.0, 1.0);
        assert_eq!((regression.b[1] * 10.0).round() / 10.0, 2.0);
        assert!(regression.pval[1] < 0.01);
    }

    #[test]
    fn test_linear_regression_singular() {
        // Two identical columns make X'X singular
        let mut regression = LinearRegression::new();
        regression.x =
            Array2::from_shape_vec((4, 2), vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        regression.y = Array1::from_vec(vec![0.0, 1.0, 2.0, 3.0]);
        assert!(regression.estimate_effects().is_err());
    }
}
