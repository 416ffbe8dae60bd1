use crate::base::*;
use ndarray::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Error, ErrorKind, Write};

/// Per-sample polygenic score: the dosage matrix times the per-marker allelic
/// weights. Expects a complete (imputed) dosage matrix.
pub fn compute_pgs(
    genotypes: &GenotypesAndPhenotypes,
    weights: &Array1<f64>,
) -> io::Result<Array1<f64>> {
    genotypes.check()?;
    if genotypes.p() != weights.len() {
        return Err(Error::new(
            ErrorKind::Other,
            "The weight vector and the dosage matrix columns are not the same size.",
        ));
    }
    if genotypes.dosages.iter().any(|x| x.is_nan()) {
        return Err(Error::new(
            ErrorKind::Other,
            "The dosage matrix contains missing values. Please impute (e.g. mean imputation) before scoring.",
        ));
    }
    Ok(genotypes.dosages.dot(weights))
}

pub fn write_scores(
    genotypes: &GenotypesAndPhenotypes,
    scores: &Array1<f64>,
    filename: &String,
) -> io::Result<String> {
    if genotypes.n() != scores.len() {
        return Err(Error::new(
            ErrorKind::Other,
            "The score vector and the sample names are not the same size.",
        ));
    }
    let mut writer = BufWriter::new(File::create(filename)?);
    writer.write_all("sample\tscore\n".as_bytes())?;
    for i in 0..genotypes.n() {
        writer.write_all(
            (genotypes.sample_names[i].clone() + "\t" + &scores[i].to_string() + "\n").as_bytes(),
        )?;
    }
    Ok(filename.clone())
}
