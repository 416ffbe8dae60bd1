use crate::base::*;
use ndarray::prelude::*;
use std::io::{self, Error, ErrorKind};

/// Greedy p-value-ordered clumping: walk markers from most to least
/// significant, keep each marker not yet pruned, and prune every marker in
/// its window correlated at r² >= r2_threshold. Returns the retained marker
/// indices sorted by genomic order.
pub fn clump_indices(
    sumstats: &SummaryStatistics,
    ld: &LdMatrix,
    r2_threshold: f64,
) -> io::Result<Vec<usize>> {
    let p = sumstats.p();
    if p != ld.p() {
        return Err(Error::new(
            ErrorKind::Other,
            "The summary statistics table and the LD matrix do not cover the same markers.",
        ));
    }
    if (r2_threshold <= 0.0) | (r2_threshold > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The clumping r² threshold needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    let mut order = (0..p)
        .filter(|&j| !sumstats.effects[j].is_nan())
        .collect::<Vec<usize>>();
    order.sort_by(|&a, &b| {
        sumstats.pvalues[a]
            .partial_cmp(&sumstats.pvalues[b])
            .unwrap()
    });
    let mut pruned = vec![false; p];
    let mut kept: Vec<usize> = vec![];
    for j in order {
        if pruned[j] {
            continue;
        }
        kept.push(j);
        for (k, r) in ld.neighbours(j) {
            if r.powf(2.0) >= r2_threshold {
                pruned[k] = true;
            }
        }
    }
    kept.sort();
    Ok(kept)
}

/// GWAS effects on the clumped marker set, zero elsewhere
#[function_name::named]
pub fn clumping(
    sumstats: &SummaryStatistics,
    ld: &LdMatrix,
    params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let kept = clump_indices(sumstats, ld, params.r2_threshold)?;
    let mut weights: Array1<f64> = Array1::from_elem(sumstats.p(), 0.0);
    for j in kept {
        weights[j] = sumstats.effects[j];
    }
    Ok((weights, function_name!().to_owned()))
}

/// Clumping composed with the p-value threshold
#[function_name::named]
pub fn clump_and_threshold(
    sumstats: &SummaryStatistics,
    ld: &LdMatrix,
    params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let kept = clump_indices(sumstats, ld, params.r2_threshold)?;
    let mut weights: Array1<f64> = Array1::from_elem(sumstats.p(), 0.0);
    for j in kept {
        if sumstats.pvalues[j] < params.p_threshold {
            weights[j] = sumstats.effects[j];
        }
    }
    Ok((weights, function_name!().to_owned()))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    // Three markers in one window: rs0 and rs1 nearly duplicate each other,
    // rs2 is independent
    fn toy_sumstats() -> SummaryStatistics {
        SummaryStatistics {
            marker_ids: vec!["rs0".to_owned(), "rs1".to_owned(), "rs2".to_owned()],
            chromosome: vec!["1".to_owned(); 3],
            position: vec![100, 200, 300],
            allele_effect: vec!["A".to_owned(); 3],
            allele_other: vec!["G".to_owned(); 3],
            frequencies: Array1::from_vec(vec![0.2, 0.3, 0.4]),
            effects: Array1::from_vec(vec![0.5, 0.45, -0.2]),
            standard_errors: Array1::from_vec(vec![0.05, 0.06, 0.1]),
            pvalues: Array1::from_vec(vec![1e-8, 1e-6, 0.01]),
            sample_sizes: Array1::from_vec(vec![100.0; 3]),
        }
    }

    fn toy_ld() -> LdMatrix {
        // corr(rs0, rs1) = 0.95, corr with rs2 ~ 0
        LdMatrix {
            window_starts: vec![0, 0, 0],
            correlations: vec![
                Array1::from_vec(vec![1.0]),
                Array1::from_vec(vec![0.95, 1.0]),
                Array1::from_vec(vec![0.01, 0.02, 1.0]),
            ],
        }
    }

    fn toy_params(p_threshold: f64) -> ScoringParams {
        ScoringParams {
            marker_sds: Array1::from_elem(3, 1.0),
            p_threshold: p_threshold,
            r2_threshold: 0.5,
            p_causal: 0.1,
            gibbs: GibbsParams {
                p_causal_grid: vec![0.1],
                heritability: 0.5,
                n_burnin: 10,
                n_iter: 10,
                seed: 1,
            },
        }
    }

    #[test]
    fn test_clump_indices() {
        // rs0 is the most significant so it prunes rs1; rs2 survives
        let kept = clump_indices(&toy_sumstats(), &toy_ld(), 0.5).unwrap();
        assert_eq!(vec![0usize, 2usize], kept);
    }

    #[test]
    fn test_clumping_weights() {
        let (weights, name) = clumping(&toy_sumstats(), &toy_ld(), &toy_params(1.0)).unwrap();
        assert_eq!("clumping".to_owned(), name);
        assert_eq!(Array1::from_vec(vec![0.5, 0.0, -0.2]), weights);
    }

    #[test]
    fn test_clump_and_threshold_weights() {
        // The stricter threshold also drops rs2 (p = 0.01)
        let (weights, name) =
            clump_and_threshold(&toy_sumstats(), &toy_ld(), &toy_params(1e-3)).unwrap();
        assert_eq!("clump_and_threshold".to_owned(), name);
        assert_eq!(Array1::from_vec(vec![0.5, 0.0, 0.0]), weights);
    }

    #[test]
    fn test_clump_indices_rejects_bad_threshold() {
        assert!(clump_indices(&toy_sumstats(), &toy_ld(), 0.0).is_err());
    }
}
