use crate::base::*;
use log::info;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::io::{self, Error, ErrorKind};

fn phenotype_is_binary(phenotypes: &Array1<f64>) -> bool {
    phenotypes
        .iter()
        .filter(|y| !y.is_nan())
        .all(|&y| (y == 0.0) | (y == 1.0))
}

// Fit one marker: returns (frequency, effect, standard error, p-value, n used)
fn scan_one_marker(
    genotypes: &GenotypesAndPhenotypes,
    j: usize,
    binary: bool,
) -> (f64, f64, f64, f64, f64) {
    // Keep only samples with both dosage and phenotype observed
    let mut dosage: Vec<f64> = vec![];
    let mut phenotype: Vec<f64> = vec![];
    for i in 0..genotypes.n() {
        let x = genotypes.dosages[(i, j)];
        let y = genotypes.phenotypes[i];
        if x.is_nan() | y.is_nan() {
            continue;
        }
        dosage.push(x);
        phenotype.push(y);
    }
    let n = dosage.len();
    let frequency = if n > 0 {
        dosage.iter().sum::<f64>() / (2.0 * n as f64)
    } else {
        f64::NAN
    };
    let failed = (frequency, f64::NAN, f64::NAN, 1.0, n as f64);
    if n < 3 {
        return failed;
    }
    let mut x: Array2<f64> = Array2::from_elem((n, 2), 1.0);
    for i in 0..n {
        x[(i, 1)] = dosage[i];
    }
    let y = Array1::from_vec(phenotype);
    let (b, se, pval) = if binary {
        let mut regression = LogisticRegression::new();
        regression.x = x;
        regression.y = y;
        match regression.estimate_significance() {
            Ok(fitted) => (fitted.b[1], fitted.v_b[1].sqrt(), fitted.pval[1]),
            Err(_) => return (frequency, failed.1, failed.2, failed.3, failed.4),
        }
    } else {
        let mut regression = LinearRegression::new();
        regression.x = x;
        regression.y = y;
        match regression.estimate_significance() {
            Ok(fitted) => (fitted.b[1], fitted.v_b[1].sqrt(), fitted.pval[1]),
            Err(_) => return (frequency, failed.1, failed.2, failed.3, failed.4),
        }
    };
    (frequency, b, se, pval, n as f64)
}

/// Genome-wide per-marker association scan: logistic regression of case
/// status on dosage for binary phenotypes, least squares on the liability
/// scale otherwise. Monomorphic or otherwise unfittable markers are reported
/// with a missing effect and p = 1 instead of aborting the scan.
pub fn gwas_scan(genotypes: &GenotypesAndPhenotypes) -> io::Result<SummaryStatistics> {
    genotypes.check()?;
    let p = genotypes.p();
    if genotypes.phenotypes.iter().all(|y| y.is_nan()) {
        return Err(Error::new(
            ErrorKind::Other,
            "All phenotypes are missing. Cannot run the association scan.",
        ));
    }
    let binary = phenotype_is_binary(&genotypes.phenotypes);
    info!(
        "Association scan across {} markers on {} samples ({} phenotype)",
        p,
        genotypes.n(),
        if binary { "binary" } else { "quantitative" }
    );
    let results = (0..p)
        .into_par_iter()
        .map(|j| scan_one_marker(genotypes, j, binary))
        .collect::<Vec<(f64, f64, f64, f64, f64)>>();
    let mut frequencies: Array1<f64> = Array1::from_elem(p, f64::NAN);
    let mut effects: Array1<f64> = Array1::from_elem(p, f64::NAN);
    let mut standard_errors: Array1<f64> = Array1::from_elem(p, f64::NAN);
    let mut pvalues: Array1<f64> = Array1::from_elem(p, f64::NAN);
    let mut sample_sizes: Array1<f64> = Array1::from_elem(p, f64::NAN);
    for (j, (frequency, b, se, pval, n)) in results.into_iter().enumerate() {
        frequencies[j] = frequency;
        effects[j] = b;
        standard_errors[j] = se;
        pvalues[j] = pval;
        sample_sizes[j] = n;
    }
    info!(
        "Scan finished: {} markers fitted, {} reported missing",
        effects.iter().filter(|b| !b.is_nan()).count(),
        effects.iter().filter(|b| b.is_nan()).count()
    );
    Ok(SummaryStatistics {
        marker_ids: genotypes.marker_ids.clone(),
        chromosome: genotypes.chromosome.clone(),
        position: genotypes.position.clone(),
        allele_effect: genotypes.allele_effect.clone(),
        allele_other: genotypes.allele_other.clone(),
        frequencies: frequencies,
        effects: effects,
        standard_errors: standard_errors,
        pvalues: pvalues,
        sample_sizes: sample_sizes,
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{simulate_genotypes, simulate_phenotypes};

    #[test]
    fn test_gwas_scan_recovers_causal_markers() {
        // One large-effect causal marker among independent markers
        let mut genotypes =
            simulate_genotypes(800, 50, 5, 5_000_000, 1_000, 0.2, 17).unwrap();
        let params = SimulationParams {
            heritability: 0.6,
            n_causal: 1,
            prevalence: 0.3,
            seed: 17,
        };
        let simulated = simulate_phenotypes(&mut genotypes, &params).unwrap();
        let sumstats = gwas_scan(&genotypes).unwrap();
        assert_eq!(50, sumstats.p());
        // The causal marker is among the most significant
        let causal = simulated.causal_indices[0];
        let causal_pval = sumstats.pvalues[causal];
        let more_significant = sumstats
            .pvalues
            .iter()
            .filter(|&&pval| pval < causal_pval)
            .count();
        assert!(more_significant < 5);
        assert!(causal_pval < 0.05);
        // Effect sign agrees with the simulated effect
        assert_eq!(
            sumstats.effects[causal] > 0.0,
            simulated.causal_effects[0] > 0.0
        );
    }

    #[test]
    fn test_gwas_scan_monomorphic_marker() {
        let mut genotypes = simulate_genotypes(100, 10, 1, 1_000_000, 1_000, 0.3, 5).unwrap();
        // Force a monomorphic marker
        genotypes.dosages.column_mut(3).fill(2.0);
        let params = SimulationParams {
            heritability: 0.5,
            n_causal: 2,
            prevalence: 0.5,
            seed: 5,
        };
        simulate_phenotypes(&mut genotypes, &params).unwrap();
        let sumstats = gwas_scan(&genotypes).unwrap();
        assert!(sumstats.effects[3].is_nan());
        assert_eq!(1.0, sumstats.pvalues[3]);
        assert_eq!(1.0, sumstats.frequencies[3]);
    }

    #[test]
    fn test_gwas_scan_too_few_complete_cases_keeps_frequency() {
        let mut genotypes = simulate_genotypes(100, 10, 1, 1_000_000, 1_000, 0.3, 19).unwrap();
        let params = SimulationParams {
            heritability: 0.5,
            n_causal: 2,
            prevalence: 0.5,
            seed: 19,
        };
        simulate_phenotypes(&mut genotypes, &params).unwrap();
        // Leave only two observed dosages at marker 7: both homozygous A1
        for i in 2..100 {
            genotypes.dosages[(i, 7)] = f64::NAN;
        }
        genotypes.dosages[(0, 7)] = 2.0;
        genotypes.dosages[(1, 7)] = 2.0;
        let sumstats = gwas_scan(&genotypes).unwrap();
        // Unfittable, but the observed frequency is still reported
        assert!(sumstats.effects[7].is_nan());
        assert_eq!(1.0, sumstats.pvalues[7]);
        assert_eq!(1.0, sumstats.frequencies[7]);
        assert_eq!(2.0, sumstats.sample_sizes[7]);
    }
}
