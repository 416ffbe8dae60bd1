use crate::base::*;
use log::info;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::io::{self, Error, ErrorKind};

/// Pairwise Pearson correlations between markers within a physical window on
/// the same chromosome, stored as a banded lower-triangular structure.
/// Expects a complete (imputed) dosage matrix.
pub fn ld_matrix(genotypes: &GenotypesAndPhenotypes, window_bp: u64) -> io::Result<LdMatrix> {
    genotypes.check()?;
    if genotypes.dosages.iter().any(|x| x.is_nan()) {
        return Err(Error::new(
            ErrorKind::Other,
            "The dosage matrix contains missing values. Please impute (e.g. mean imputation) before estimating LD.",
        ));
    }
    let p = genotypes.p();
    // Each chromosome needs to be a single contiguous, position-sorted block
    // for the windows to stay within chromosomes
    let mut seen: Vec<&String> = vec![];
    for j in 0..p {
        if (j > 0) && (genotypes.chromosome[j] == genotypes.chromosome[j - 1]) {
            if genotypes.position[j] < genotypes.position[j - 1] {
                return Err(Error::new(
                    ErrorKind::Other,
                    "The markers need to be sorted by position within each chromosome.",
                ));
            }
        } else {
            if seen.contains(&&genotypes.chromosome[j]) {
                return Err(Error::new(
                    ErrorKind::Other,
                    "Chromosome ".to_owned()
                        + &genotypes.chromosome[j]
                        + " appears in more than one block. Please sort the markers by chromosome and position.",
                ));
            }
            seen.push(&genotypes.chromosome[j]);
        }
    }
    // First marker of each window: same chromosome and within window_bp
    let mut window_starts: Vec<usize> = vec![0; p];
    let mut start: usize = 0;
    for j in 0..p {
        while (genotypes.chromosome[start] != genotypes.chromosome[j])
            || (genotypes.position[j] - genotypes.position[start] > window_bp)
        {
            start += 1;
        }
        window_starts[j] = start;
    }
    info!(
        "Estimating LD for {} markers within {} bp windows",
        p, window_bp
    );
    let correlations = (0..p)
        .into_par_iter()
        .map(|j| {
            let mut row: Array1<f64> = Array1::from_elem(j - window_starts[j] + 1, 1.0);
            for k in window_starts[j]..j {
                let (r, _) = pearsons_correlation(
                    &genotypes.dosages.column(k),
                    &genotypes.dosages.column(j),
                )
                .unwrap();
                row[k - window_starts[j]] = r;
            }
            row
        })
        .collect::<Vec<Array1<f64>>>();
    Ok(LdMatrix {
        window_starts: window_starts,
        correlations: correlations,
    })
}

impl LdMatrix {
    pub fn p(&self) -> usize {
        self.window_starts.len()
    }

    // Symmetric accessor; zero outside the band
    pub fn get(&self, j: usize, k: usize) -> f64 {
        let (lo, hi) = if j <= k { (j, k) } else { (k, j) };
        if lo >= self.window_starts[hi] {
            self.correlations[hi][lo - self.window_starts[hi]]
        } else {
            0.0
        }
    }

    // All markers sharing a window with marker j, with their correlation to j
    pub fn neighbours(&self, j: usize) -> Vec<(usize, f64)> {
        let mut out: Vec<(usize, f64)> = vec![];
        for k in self.window_starts[j]..j {
            out.push((k, self.correlations[j][k - self.window_starts[j]]));
        }
        for k in (j + 1)..self.p() {
            // window_starts is non-decreasing, so the band to the right ends here
            if self.window_starts[k] > j {
                break;
            }
            out.push((k, self.correlations[k][j - self.window_starts[k]]));
        }
        out
    }
}
