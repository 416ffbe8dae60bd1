use crate::base::*;
use ndarray::prelude::*;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::{ContinuousCDF, Normal, Uniform};
use std::io::{self, Error, ErrorKind};

// Simulate biallelic genotypes with distance-decaying linkage disequilibrium.
// Each haplotype follows a Gaussian autoregressive chain along the chromosome
// whose adjacent-marker correlation decays with physical distance, and the
// allele carried at a marker is the chain thresholded at the allele frequency.
// LD never leaks across chromosome boundaries because each chromosome restarts
// the chains.
pub fn simulate_genotypes(
    n: usize,
    p: usize,
    n_chr: usize,
    max_bp: usize,
    r2_half_bp: usize,
    min_allele_frequency: f64,
    seed: u64,
) -> io::Result<GenotypesAndPhenotypes> {
    if (n < 2) | (p < 1) | (n_chr < 1) | (p < n_chr) {
        return Err(Error::new(
            ErrorKind::Other,
            "Please simulate at least 2 samples and 1 marker per chromosome.",
        ));
    }
    if (min_allele_frequency <= 0.0) | (min_allele_frequency >= 0.5) {
        return Err(Error::new(
            ErrorKind::Other,
            "The minimum allele frequency of the simulated markers needs to be between 0.0 and 0.5 exclusive.",
        ));
    }
    // Define approximately equally sized chromosomes
    let mut chromosome_sizes = vec![p / n_chr; n_chr];
    let p_ = chromosome_sizes.iter().fold(0, |sum, &x| sum + x);
    // If we have less or more than the required number of markers we add or subtract markers from the last chromosome
    if p_ < p {
        chromosome_sizes[n_chr - 1] += p - p_;
    } else if p_ > p {
        chromosome_sizes[n_chr - 1] -= p_ - p;
    }
    let max_bp_per_chr = max_bp / n_chr;
    let mut rng = StdRng::seed_from_u64(seed);
    let dist_position = Uniform::new(0.0, max_bp_per_chr as f64).unwrap();
    let dist_frequency =
        Uniform::new(min_allele_frequency, 1.0 - min_allele_frequency).unwrap();
    let dist_gauss = Normal::new(0.0, 1.0).unwrap();
    let alleles = vec!["A", "T", "C", "G"];
    let dist_allele = Uniform::new(0.0, alleles.len() as f64).unwrap();
    // Sample marker coordinates per chromosome
    let mut chromosome: Vec<String> = Vec::with_capacity(p);
    let mut position: Vec<u64> = Vec::with_capacity(p);
    let mut marker_ids: Vec<String> = Vec::with_capacity(p);
    let mut allele_effect: Vec<String> = Vec::with_capacity(p);
    let mut allele_other: Vec<String> = Vec::with_capacity(p);
    let mut frequencies: Vec<f64> = Vec::with_capacity(p);
    let mut idx: usize = 0;
    for i in 0..n_chr {
        let s = chromosome_sizes[i];
        let mut tmp_positions: Vec<u64> = vec![];
        for _ in 0..s {
            tmp_positions.push(dist_position.sample(&mut rng).floor() as u64);
        }
        tmp_positions.sort();
        for j in 0..s {
            chromosome.push("chr".to_owned() + &i.to_string());
            position.push(tmp_positions[j]);
            marker_ids.push("rs".to_owned() + &idx.to_string());
            let a1 = dist_allele.sample(&mut rng).floor() as usize;
            let mut a2 = dist_allele.sample(&mut rng).floor() as usize;
            while a2 == a1 {
                a2 = dist_allele.sample(&mut rng).floor() as usize;
            }
            allele_effect.push(alleles[a1].to_owned());
            allele_other.push(alleles[a2].to_owned());
            frequencies.push(dist_frequency.sample(&mut rng));
            idx += 1;
        }
    }
    // Walk the two haplotype chains per chromosome and threshold into alleles
    let mut dosages: Array2<f64> = Array2::from_elem((n, p), 0.0);
    let mut chains: Vec<Array1<f64>> = vec![Array1::from_elem(n, 0.0), Array1::from_elem(n, 0.0)];
    let mut j: usize = 0;
    for i in 0..n_chr {
        let s = chromosome_sizes[i];
        for local in 0..s {
            // Correlation to the previous marker's latent value; r² halves every r2_half_bp
            let rho = if local == 0 {
                0.0
            } else {
                let distance = (position[j] - position[j - 1]) as f64;
                0.5_f64.powf(0.5 * distance / r2_half_bp as f64)
            };
            let threshold = dist_gauss.inverse_cdf(frequencies[j]);
            for chain in chains.iter_mut() {
                for z in chain.iter_mut() {
                    let innovation = dist_gauss.sample(&mut rng);
                    *z = (rho * *z) + ((1.0 - rho.powf(2.0)).sqrt() * innovation);
                }
            }
            for k in 0..n {
                let a = (chains[0][k] < threshold) as u64;
                let b = (chains[1][k] < threshold) as u64;
                dosages[(k, j)] = (a + b) as f64;
            }
            j += 1;
        }
    }
    let sample_names = (0..n)
        .map(|i| "ind".to_owned() + &i.to_string())
        .collect::<Vec<String>>();
    let out = GenotypesAndPhenotypes {
        chromosome: chromosome,
        position: position,
        marker_ids: marker_ids,
        allele_effect: allele_effect,
        allele_other: allele_other,
        dosages: dosages,
        phenotypes: Array1::from_elem(n, f64::NAN),
        sample_names: sample_names,
    };
    out.check()?;
    Ok(out)
}
