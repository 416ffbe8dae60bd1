use crate::base::*;
use ndarray::prelude::*;
use std::io::{self, Error, ErrorKind};

impl GenotypesAndPhenotypes {
    pub fn n(&self) -> usize {
        self.dosages.nrows()
    }

    pub fn p(&self) -> usize {
        self.dosages.ncols()
    }

    // Make sure the marker metadata, dosage matrix and phenotypes agree in size
    pub fn check(&self) -> io::Result<&Self> {
        let (n, p) = self.dosages.dim();
        if (self.chromosome.len() != p)
            | (self.position.len() != p)
            | (self.marker_ids.len() != p)
            | (self.allele_effect.len() != p)
            | (self.allele_other.len() != p)
        {
            return Err(Error::new(
                ErrorKind::Other,
                "The marker metadata vectors and the dosage matrix columns are not the same size.",
            ));
        }
        if (self.phenotypes.len() != n) | (self.sample_names.len() != n) {
            return Err(Error::new(
                ErrorKind::Other,
                "The phenotype vector, sample names and the dosage matrix rows are not the same size.",
            ));
        }
        Ok(self)
    }

    // Frequencies of the counted (A1) allele, i.e. mean dosage halved
    pub fn allele_frequencies(&self) -> io::Result<Array1<f64>> {
        let (means, _sds) = column_means_and_sds(&self.dosages)?;
        Ok(means.map(|x| x / 2.0))
    }

    pub fn missingness(&self) -> Array1<f64> {
        let (n, p) = self.dosages.dim();
        let mut out: Array1<f64> = Array1::from_elem(p, 0.0);
        for j in 0..p {
            let n_missing = self.dosages.column(j).iter().filter(|x| x.is_nan()).count();
            out[j] = n_missing as f64 / n as f64;
        }
        out
    }

    // Replace missing dosages with the column mean so the scan and scoring see complete columns
    pub fn mean_impute(&mut self) -> io::Result<&mut Self> {
        let (means, _sds) = column_means_and_sds(&self.dosages)?;
        let p = self.p();
        for j in 0..p {
            let mu = means[j];
            self.dosages
                .column_mut(j)
                .map_inplace(|x| {
                    if x.is_nan() {
                        *x = mu;
                    }
                });
        }
        Ok(self)
    }

    // Drop markers failing the allele frequency and missingness thresholds
    pub fn filter(&mut self, filter_stats: &FilterStats) -> io::Result<&mut Self> {
        self.check()?;
        let frequencies = self.allele_frequencies()?;
        let missingness = self.missingness();
        let p = self.p();
        let mut keep: Vec<usize> = vec![];
        for j in 0..p {
            let maf = frequencies[j].min(1.0 - frequencies[j]);
            if maf.is_nan() {
                continue;
            }
            if (maf >= filter_stats.min_allele_frequency)
                & (missingness[j] <= filter_stats.max_missingness)
            {
                keep.push(j);
            }
        }
        if keep.is_empty() {
            return Err(Error::new(
                ErrorKind::Other,
                "All markers were removed by the filters. Please relax --min-allele-frequency and/or --max-missingness.",
            ));
        }
        self.chromosome = keep.iter().map(|&j| self.chromosome[j].clone()).collect();
        self.position = keep.iter().map(|&j| self.position[j]).collect();
        self.marker_ids = keep.iter().map(|&j| self.marker_ids[j].clone()).collect();
        self.allele_effect = keep
            .iter()
            .map(|&j| self.allele_effect[j].clone())
            .collect();
        self.allele_other = keep.iter().map(|&j| self.allele_other[j].clone()).collect();
        self.dosages = self.dosages.select(Axis(1), &keep);
        Ok(self)
    }

    // Dosage standard deviations used to move between allelic and standardised effect scales
    pub fn marker_sds(&self) -> io::Result<Array1<f64>> {
        let (_means, sds) = column_means_and_sds(&self.dosages)?;
        Ok(sds)
    }
}
