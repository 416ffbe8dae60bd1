use crate::base::*;
use log::info;
use ndarray::prelude::*;
use ndarray_linalg::Solve;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use statrs::distribution::Normal;
use std::io::{self, Error, ErrorKind};

// The shrinkage methods work on the standardised-genotype scale where the
// marginal effect of marker j is z_j / sqrt(n_j). Markers the scan could not
// fit are carried as zero and never re-weighted.
fn standardised_marginal_effects(
    sumstats: &SummaryStatistics,
) -> io::Result<(Array1<f64>, Vec<bool>, f64, usize)> {
    let p = sumstats.p();
    let mut beta_hat: Array1<f64> = Array1::from_elem(p, 0.0);
    let mut valid = vec![false; p];
    let mut n_sum = 0.0;
    let mut m = 0;
    for j in 0..p {
        let b = sumstats.effects[j];
        let se = sumstats.standard_errors[j];
        let n = sumstats.sample_sizes[j];
        if b.is_nan() | se.is_nan() | (se == 0.0) | n.is_nan() | (n < 2.0) {
            continue;
        }
        beta_hat[j] = (b / se) / n.sqrt();
        valid[j] = true;
        n_sum += n;
        m += 1;
    }
    if m == 0 {
        return Err(Error::new(
            ErrorKind::Other,
            "No marker in the summary statistics table has a usable effect, standard error and sample size.",
        ));
    }
    Ok((beta_hat, valid, n_sum / m as f64, m))
}

// Back to the allelic (per-dosage) scale
fn allelic_weights(beta_std: &Array1<f64>, marker_sds: &Array1<f64>) -> Array1<f64> {
    let mut out = beta_std.clone();
    for j in 0..out.len() {
        let sd = marker_sds[j];
        if sd.is_nan() | (sd == 0.0) {
            out[j] = 0.0;
        } else {
            out[j] /= sd;
        }
    }
    out
}

// Maximal runs of band-connected markers; a marker opening its own window
// starts a new independent block
fn ld_blocks(ld: &LdMatrix) -> Vec<(usize, usize)> {
    let p = ld.p();
    let mut blocks: Vec<(usize, usize)> = vec![];
    let mut start: usize = 0;
    for j in 1..p {
        if ld.window_starts[j] == j {
            blocks.push((start, j));
            start = j;
        }
    }
    blocks.push((start, p));
    blocks
}

/// Infinitesimal-prior shrinkage: every marker is causal with a tiny effect,
/// so the joint effects solve (R + (m / (n h²)) I) β = β_hat per LD block.
#[function_name::named]
pub fn ldpred_inf(
    sumstats: &SummaryStatistics,
    ld: &LdMatrix,
    params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let (beta_hat, valid, n, m) = standardised_marginal_effects(sumstats)?;
    let h2 = params.gibbs.heritability;
    if (h2 <= 0.0) | (h2 > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The heritability parameter of the shrinkage prior needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    let lambda = m as f64 / (n * h2);
    let mut beta_joint: Array1<f64> = Array1::from_elem(beta_hat.len(), 0.0);
    for (start, end) in ld_blocks(ld) {
        let size = end - start;
        let mut r_matrix: Array2<f64> = Array2::from_elem((size, size), 0.0);
        for j in 0..size {
            for k in 0..size {
                r_matrix[(j, k)] = ld.get(start + j, start + k);
            }
            r_matrix[(j, j)] += lambda;
        }
        let b = beta_hat.slice(s![start..end]).to_owned();
        let solution = match r_matrix.solve(&b) {
            Ok(x) => x,
            Err(_) => {
                return Err(Error::new(
                    ErrorKind::Other,
                    "Failed to solve the regularised LD system. The LD block may be degenerate.",
                ))
            }
        };
        for j in 0..size {
            beta_joint[start + j] = solution[j];
        }
    }
    // Markers without usable marginal statistics keep a zero weight
    for j in 0..beta_joint.len() {
        if !valid[j] {
            beta_joint[j] = 0.0;
        }
    }
    Ok((
        allelic_weights(&beta_joint, &params.marker_sds),
        function_name!().to_owned(),
    ))
}

/// Spike-and-slab Gibbs sampler: each marker is causal with prior probability
/// p_causal and causal effects are N(0, h² / (m p_causal)). Per sweep and
/// marker the sampler residualises the marginal effect against the current
/// sampled effects of its LD window, draws the inclusion indicator from the
/// posterior odds, then the effect from the slab posterior. The reported
/// weights are the post-burn-in posterior mean effects.
#[function_name::named]
pub fn ldpred_gibbs(
    sumstats: &SummaryStatistics,
    ld: &LdMatrix,
    params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let (beta_hat, valid, n, m) = standardised_marginal_effects(sumstats)?;
    let p = beta_hat.len();
    let p_causal = params.p_causal;
    let h2 = params.gibbs.heritability;
    if (p_causal <= 0.0) | (p_causal > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The proportion of causal markers needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    if (h2 <= 0.0) | (h2 > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The heritability parameter of the shrinkage prior needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    if params.gibbs.n_iter < 1 {
        return Err(Error::new(
            ErrorKind::Other,
            "The Gibbs sampler needs at least 1 post-burn-in iteration.",
        ));
    }
    let sigma2 = h2 / (m as f64 * p_causal);
    let c = n * sigma2;
    let post_var = sigma2 / (1.0 + c);
    let shrink = c / (1.0 + c);
    // Band neighbourhoods are fixed across sweeps
    let neighbourhoods = (0..p).map(|j| ld.neighbours(j)).collect::<Vec<Vec<(usize, f64)>>>();
    let mut rng = StdRng::seed_from_u64(params.gibbs.seed);
    let dist_gauss = Normal::new(0.0, 1.0).unwrap();
    let mut beta_cur: Array1<f64> = Array1::from_elem(p, 0.0);
    let mut beta_sum: Array1<f64> = Array1::from_elem(p, 0.0);
    let n_sweeps = params.gibbs.n_burnin + params.gibbs.n_iter;
    info!(
        "Gibbs sampler: p_causal={}, h2={}, {} sweeps over {} markers",
        p_causal, h2, n_sweeps, m
    );
    for sweep in 0..n_sweeps {
        for j in 0..p {
            if !valid[j] {
                continue;
            }
            // Residualised marginal effect against the rest of the window
            let mut btilde = beta_hat[j];
            for &(k, r) in neighbourhoods[j].iter() {
                btilde -= r * beta_cur[k];
            }
            let post_mean = shrink * btilde;
            // Posterior odds of being causal: prior odds times the
            // slab-vs-spike marginal likelihood ratio of btilde
            let lr_inv = (1.0 + c).sqrt() * (-0.5 * n * shrink * btilde.powf(2.0)).exp();
            let p_incl = p_causal / (p_causal + (1.0 - p_causal) * lr_inv);
            beta_cur[j] = if rng.gen::<f64>() < p_incl {
                post_mean + (post_var.sqrt() * dist_gauss.sample(&mut rng))
            } else {
                0.0
            };
        }
        if sweep >= params.gibbs.n_burnin {
            beta_sum = &beta_sum + &beta_cur;
        }
    }
    let beta_post = beta_sum.map(|x| x / params.gibbs.n_iter as f64);
    Ok((
        allelic_weights(&beta_post, &params.marker_sds),
        function_name!().to_owned(),
    ))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    // Three independent markers (identity LD): rs0 is strongly associated,
    // rs1 weakly, rs2 unfittable
    fn toy_sumstats() -> SummaryStatistics {
        SummaryStatistics {
            marker_ids: vec!["rs0".to_owned(), "rs1".to_owned(), "rs2".to_owned()],
            chromosome: vec!["1".to_owned(); 3],
            position: vec![100, 200, 300],
            allele_effect: vec!["A".to_owned(); 3],
            allele_other: vec!["G".to_owned(); 3],
            frequencies: Array1::from_vec(vec![0.2, 0.3, 0.4]),
            effects: Array1::from_vec(vec![0.5, 0.01, f64::NAN]),
            standard_errors: Array1::from_vec(vec![0.05, 0.02, f64::NAN]),
            pvalues: Array1::from_vec(vec![1e-8, 0.61, 1.0]),
            sample_sizes: Array1::from_vec(vec![100.0; 3]),
        }
    }

    fn identity_ld() -> LdMatrix {
        LdMatrix {
            window_starts: vec![0, 1, 2],
            correlations: vec![
                Array1::from_vec(vec![1.0]),
                Array1::from_vec(vec![1.0]),
                Array1::from_vec(vec![1.0]),
            ],
        }
    }

    fn toy_params(p_causal: f64) -> ScoringParams {
        ScoringParams {
            marker_sds: Array1::from_elem(3, 1.0),
            p_threshold: 1e-3,
            r2_threshold: 0.5,
            p_causal: p_causal,
            gibbs: GibbsParams {
                p_causal_grid: vec![p_causal],
                heritability: 0.5,
                n_burnin: 100,
                n_iter: 400,
                seed: 42,
            },
        }
    }

    #[test]
    fn test_ldpred_inf_identity_ld() {
        // With R = I each marker shrinks by exactly 1 / (1 + m / (n h²))
        let (weights, name) =
            ldpred_inf(&toy_sumstats(), &identity_ld(), &toy_params(0.1)).unwrap();
        assert_eq!("ldpred_inf".to_owned(), name);
        let lambda = 2.0 / (100.0 * 0.5); // two usable markers
        let beta_std_rs0 = (0.5 / 0.05) / 100.0_f64.sqrt();
        let expected_rs0 = beta_std_rs0 / (1.0 + lambda);
        assert_eq!(
            (expected_rs0 * 1e10).round(),
            (weights[0] * 1e10).round()
        );
        // The unfittable marker keeps a zero weight
        assert_eq!(0.0, weights[2]);
        // Shrinkage never changes the sign of an isolated marker
        assert!(weights[0] > 0.0);
        assert!(weights[1] > 0.0);
    }

    #[test]
    fn test_ldpred_gibbs_dense_prior() {
        // p_causal = 1 reduces the sampler to the infinitesimal posterior mean
        let (weights, name) =
            ldpred_gibbs(&toy_sumstats(), &identity_ld(), &toy_params(1.0)).unwrap();
        assert_eq!("ldpred_gibbs".to_owned(), name);
        let beta_std_rs0 = (0.5 / 0.05) / 100.0_f64.sqrt();
        let sigma2 = 0.5 / 2.0;
        let c = 100.0 * sigma2;
        let expected_rs0 = beta_std_rs0 * c / (1.0 + c);
        assert!((weights[0] - expected_rs0).abs() < 0.1);
        assert_eq!(0.0, weights[2]);
    }

    #[test]
    fn test_ldpred_gibbs_sparse_prior_zeroes_weak_markers() {
        let (dense, _) = ldpred_gibbs(&toy_sumstats(), &identity_ld(), &toy_params(1.0)).unwrap();
        let (sparse, _) =
            ldpred_gibbs(&toy_sumstats(), &identity_ld(), &toy_params(1e-4)).unwrap();
        // The weak marker is shrunk much harder under the sparse prior
        assert!(sparse[1].abs() < dense[1].abs() + 1e-12);
        assert!(sparse[1].abs() < 0.02);
        // The strong marker survives either prior with the same sign
        assert!(sparse[0] > 0.0);
    }

    #[test]
    fn test_ldpred_gibbs_rejects_bad_p_causal() {
        assert!(ldpred_gibbs(&toy_sumstats(), &identity_ld(), &toy_params(0.0)).is_err());
    }
}
