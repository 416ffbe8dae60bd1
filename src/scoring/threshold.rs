use crate::base::*;
use ndarray::prelude::*;
use std::io;

// Weighting models share one signature so the evaluation can iterate over
// them: per-marker allelic weights plus the model name.

/// Every marker keeps its raw GWAS effect (markers the scan could not fit get zero)
#[function_name::named]
pub fn all_snps(
    sumstats: &SummaryStatistics,
    _ld: &LdMatrix,
    _params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let weights = sumstats
        .effects
        .map(|&b| if b.is_nan() { 0.0 } else { b });
    Ok((weights, function_name!().to_owned()))
}

/// Keep the GWAS effect only where the association p-value clears the threshold
#[function_name::named]
pub fn p_thresholding(
    sumstats: &SummaryStatistics,
    _ld: &LdMatrix,
    params: &ScoringParams,
) -> io::Result<(Array1<f64>, String)> {
    let p = sumstats.p();
    let mut weights: Array1<f64> = Array1::from_elem(p, 0.0);
    for j in 0..p {
        if sumstats.effects[j].is_nan() {
            continue;
        }
        if sumstats.pvalues[j] < params.p_threshold {
            weights[j] = sumstats.effects[j];
        }
    }
    Ok((weights, function_name!().to_owned()))
}
