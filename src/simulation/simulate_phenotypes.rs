use crate::base::*;
use ndarray::prelude::*;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::{ContinuousCDF, Normal};
use std::io::{self, Error, ErrorKind};

// Simulate a heritable phenotype on top of real or simulated genotypes using
// the liability threshold model: a random causal subset of markers gets
// standardised effects drawn from N(0, h²/n_causal), the environment
// contributes N(0, 1-h²), and cases are the samples whose liability exceeds
// the (1 - prevalence) quantile. A prevalence of 1.0 keeps the continuous
// liability as the phenotype.
pub fn simulate_phenotypes(
    genotypes: &mut GenotypesAndPhenotypes,
    params: &SimulationParams,
) -> io::Result<SimulatedPhenotypes> {
    genotypes.check()?;
    let (n, p) = genotypes.dosages.dim();
    if (params.heritability <= 0.0) | (params.heritability > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The heritability needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    if (params.n_causal < 1) | (params.n_causal > p) {
        return Err(Error::new(
            ErrorKind::Other,
            "The number of causal markers needs to be between 1 and the number of markers.",
        ));
    }
    if (params.prevalence <= 0.0) | (params.prevalence > 1.0) {
        return Err(Error::new(
            ErrorKind::Other,
            "The prevalence needs to be between 0.0 exclusive and 1.0 inclusive.",
        ));
    }
    let mut rng = StdRng::seed_from_u64(params.seed);
    // Causal architecture
    let mut causal_indices = rand::seq::index::sample(&mut rng, p, params.n_causal)
        .into_iter()
        .collect::<Vec<usize>>();
    causal_indices.sort();
    let effect_sd = (params.heritability / params.n_causal as f64).sqrt();
    let dist_effect = Normal::new(0.0, effect_sd).unwrap();
    let causal_effects = Array1::from_vec(
        (0..params.n_causal)
            .map(|_| dist_effect.sample(&mut rng))
            .collect::<Vec<f64>>(),
    );
    // Genetic liability on the standardised dosage scale
    let (means, sds) = column_means_and_sds(&genotypes.dosages)?;
    let mut genetic_liability: Array1<f64> = Array1::from_elem(n, 0.0);
    for (k, &j) in causal_indices.iter().enumerate() {
        if (sds[j] == 0.0) | sds[j].is_nan() {
            continue; // monomorphic markers cannot carry signal
        }
        for i in 0..n {
            let dosage = genotypes.dosages[(i, j)];
            let standardised = if dosage.is_nan() {
                0.0
            } else {
                (dosage - means[j]) / sds[j]
            };
            genetic_liability[i] += causal_effects[k] * standardised;
        }
    }
    // Environmental noise completes the liability
    let dist_environment = Normal::new(0.0, (1.0 - params.heritability).sqrt()).unwrap();
    let liabilities = Array1::from_vec(
        genetic_liability
            .iter()
            .map(|&g| g + dist_environment.sample(&mut rng))
            .collect::<Vec<f64>>(),
    );
    let phenotypes = if params.prevalence < 1.0 {
        let threshold = Normal::new(0.0, 1.0)
            .unwrap()
            .inverse_cdf(1.0 - params.prevalence);
        liabilities.map(|&l| (l > threshold) as u64 as f64)
    } else {
        liabilities.clone()
    };
    genotypes.phenotypes = phenotypes.clone();
    Ok(SimulatedPhenotypes {
        phenotypes: phenotypes,
        liabilities: liabilities,
        causal_indices: causal_indices,
        causal_effects: causal_effects,
    })
}

impl SimulatedPhenotypes {
    // Write the simulated architecture for later inspection
    pub fn write_causal_table(
        &self,
        genotypes: &GenotypesAndPhenotypes,
        filename: &String,
    ) -> io::Result<String> {
        use std::io::Write;
        let mut writer = std::io::BufWriter::new(std::fs::File::create(filename)?);
        writer.write_all("id\tchr\tpos\teffect\n".as_bytes())?;
        for (k, &j) in self.causal_indices.iter().enumerate() {
            writer.write_all(
                (genotypes.marker_ids[j].clone()
                    + "\t"
                    + &genotypes.chromosome[j]
                    + "\t"
                    + &genotypes.position[j].to_string()
                    + "\t"
                    + &self.causal_effects[k].to_string()
                    + "\n")
                    .as_bytes(),
            )?;
        }
        Ok(filename.clone())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::simulate_genotypes;

    #[test]
    fn test_simulate_phenotypes_binary() {
        let mut genotypes =
            simulate_genotypes(1_000, 200, 2, 2_000_000, 100_000, 0.05, 11).unwrap();
        let params = SimulationParams {
            heritability: 0.5,
            n_causal: 50,
            prevalence: 0.2,
            seed: 11,
        };
        let simulated = simulate_phenotypes(&mut genotypes, &params).unwrap();
        // The phenotype landed in the genotype struct and is binary
        assert!(genotypes.phenotypes.iter().all(|&y| (y == 0.0) | (y == 1.0)));
        // Case fraction tracks the prevalence
        let case_fraction = genotypes.phenotypes.sum() / 1_000.0;
        assert!((case_fraction - 0.2).abs() < 0.1);
        // Cases have a higher mean liability than controls
        let mut case_liability = 0.0;
        let mut control_liability = 0.0;
        for i in 0..1_000 {
            if genotypes.phenotypes[i] == 1.0 {
                case_liability += simulated.liabilities[i];
            } else {
                control_liability += simulated.liabilities[i];
            }
        }
        assert!(case_liability / (case_fraction * 1_000.0)
            > control_liability / ((1.0 - case_fraction) * 1_000.0));
        assert_eq!(50, simulated.causal_indices.len());
    }

    #[test]
    fn test_simulate_phenotypes_heritability() {
        let mut genotypes =
            simulate_genotypes(2_000, 300, 3, 3_000_000, 100_000, 0.05, 13).unwrap();
        let params = SimulationParams {
            heritability: 0.8,
            n_causal: 100,
            prevalence: 1.0,
            seed: 13,
        };
        let simulated = simulate_phenotypes(&mut genotypes, &params).unwrap();
        // With prevalence 1.0 the phenotype is the liability itself
        assert_eq!(simulated.liabilities, genotypes.phenotypes);
        let variance = simulated
            .liabilities
            .iter()
            .fold(0.0, |sum, &x| sum + x.powf(2.0))
            / 2_000.0
            - (simulated.liabilities.mean().unwrap()).powf(2.0);
        // Total liability variance is close to h² + (1 - h²) = 1
        assert!((variance - 1.0).abs() < 0.25);
    }
}
