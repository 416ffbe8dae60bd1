use ndarray::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::io::{self, Error, ErrorKind};

pub fn pearsons_correlation(
    x: &ArrayView1<f64>,
    y: &ArrayView1<f64>,
) -> io::Result<(f64, f64)> {
    let n = x.len();
    if n != y.len() {
        return Err(Error::new(
            ErrorKind::Other,
            "Input vectors are not the same size.",
        ));
    }
    let mu_x = x.mean().unwrap();
    let mu_y = y.mean().unwrap();
    let x_less_mu_x = x.map(|x| x - mu_x);
    let y_less_mu_y = y.map(|y| y - mu_y);
    let x_less_mu_x_squared = x_less_mu_x.map(|x| x.powf(2.0));
    let y_less_mu_y_squared = y_less_mu_y.map(|y| y.powf(2.0));
    let numerator = (x_less_mu_x * y_less_mu_y).sum();
    let denominator = x_less_mu_x_squared.sum().sqrt() * y_less_mu_y_squared.sum().sqrt();
    let r_tmp = numerator / denominator;
    let r = match r_tmp.is_nan() {
        true => 0.0,
        false => r_tmp,
    };
    let sigma_r_denominator = (1.0 - r.powf(2.0)) / (n as f64 - 2.0);
    if sigma_r_denominator <= 0.0 {
        // Essentially no variance in r, hence very significant
        return Ok((r, f64::EPSILON));
    }
    let sigma_r = sigma_r_denominator.sqrt();
    let t = r / sigma_r;
    let d = StudentsT::new(0.0, 1.0, n as f64 - 2.0).unwrap();
    let pval = 2.00 * (1.00 - d.cdf(t.abs()));
    Ok((r, pval))
}

// Column means and standard deviations skipping missing (NaN) dosages
pub fn column_means_and_sds(matrix: &Array2<f64>) -> io::Result<(Array1<f64>, Array1<f64>)> {
    let (n, p) = matrix.dim();
    if n < 2 {
        return Err(Error::new(
            ErrorKind::Other,
            "At least 2 samples are needed to estimate means and standard deviations.",
        ));
    }
    let mut means: Array1<f64> = Array1::from_elem(p, f64::NAN);
    let mut sds: Array1<f64> = Array1::from_elem(p, f64::NAN);
    for j in 0..p {
        let observed = matrix
            .column(j)
            .iter()
            .filter(|x| !x.is_nan())
            .copied()
            .collect::<Vec<f64>>();
        let m = observed.len();
        if m < 2 {
            continue;
        }
        let mu = observed.iter().sum::<f64>() / m as f64;
        let var = observed
            .iter()
            .fold(0.0, |sum, &x| sum + (x - mu).powf(2.0))
            / (m as f64 - 1.0);
        means[j] = mu;
        sds[j] = var.sqrt();
    }
    Ok((means, sds))
}

pub fn parse_f64_roundup_and_own(x: f64, n_digits: usize) -> String {
    let s = x.to_string();
    if s.len() < n_digits {
        return s;
    }
    s[0..n_digits].parse::<f64>().unwrap().to_string()
}

// Rank with ties sharing their average rank (1-based), for the Mann-Whitney AUC
pub fn average_ranks(values: &Array1<f64>) -> io::Result<Array1<f64>> {
    let n = values.len();
    if n == 0 {
        return Err(Error::new(ErrorKind::Other, "Cannot rank an empty vector."));
    }
    let mut order = (0..n).collect::<Vec<usize>>();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());
    let mut ranks: Array1<f64> = Array1::from_elem(n, f64::NAN);
    let mut i: usize = 0;
    while i < n {
        let mut j = i;
        while (j + 1 < n) && (values[order[j + 1]] == values[order[i]]) {
            j += 1;
        }
        let shared_rank = ((i + 1) as f64 + (j + 1) as f64) / 2.0;
        for k in i..=j {
            ranks[order[k]] = shared_rank;
        }
        i = j + 1;
    }
    Ok(ranks)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_pearsons_correlation() {
        // Expected
        let expected_output1: f64 = 0.3849001794597505;
        let expected_output2: f64 = 0.5223146158470686;
        // Inputs
        let x_ = Array1::from_vec(vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        let y_ = Array1::from_vec(vec![2.0, 1.0, 1.0, 5.0, 2.0]);
        // Outputs
        let (corr, pval) = pearsons_correlation(&x_.view(), &y_.view()).unwrap();
        // Assertions
        assert_eq!(expected_output1, corr);
        assert_eq!(expected_output2, pval);
    }

    #[test]
    fn test_column_means_and_sds() {
        // Expected
        let expected_means: Vec<f64> = vec![1.0, 1.5];
        let expected_sds: Vec<f64> = vec![1.0, 0.7071];
        // Inputs
        let matrix: Array2<f64> =
            Array2::from_shape_vec((3, 2), vec![0.0, 1.0, 1.0, 2.0, 2.0, f64::NAN]).unwrap();
        // Outputs
        let (means, sds) = column_means_and_sds(&matrix).unwrap();
        // Assertions
        assert_eq!(expected_means[0], means[0]);
        assert_eq!(expected_means[1], means[1]);
        assert_eq!(expected_sds[0], sds[0]);
        assert_eq!((expected_sds[1] * 1e4).round(), (sds[1] * 1e4).round());
    }

    #[test]
    fn test_average_ranks() {
        // Expected
        let expected_output1: Vec<f64> = vec![4.0, 1.0, 2.5, 2.5, 5.0];
        // Inputs
        let values = Array1::from_vec(vec![2.0, 0.1, 1.0, 1.0, 3.0]);
        // Outputs
        let ranks = average_ranks(&values).unwrap();
        // Assertions
        assert_eq!(Array1::from_vec(expected_output1), ranks);
    }

    #[test]
    fn test_parse_f64_roundup_and_own() {
        assert_eq!("0.42".to_owned(), parse_f64_roundup_and_own(0.420000012435, 4));
    }
}
