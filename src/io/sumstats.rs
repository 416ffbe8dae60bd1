use crate::base::*;
use ndarray::prelude::*;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, BufWriter, Error, ErrorKind};

const MA_HEADER: &str = "SNP\tA1\tA2\tfreq\tb\tse\tp\tN";

impl Parse<SummaryStatistics> for FileSumstats {
    // Parse an .ma-style summary statistics table: SNP A1 A2 freq b se p N
    fn lparse(&self) -> io::Result<Box<SummaryStatistics>> {
        let file = match File::open(&self.filename) {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "The input summary statistics file: ".to_owned() + &self.filename + " does not exist. Please make sure you are entering the correct filename and/or the correct path.")),
        };
        let mut marker_ids: Vec<String> = vec![];
        let mut allele_effect: Vec<String> = vec![];
        let mut allele_other: Vec<String> = vec![];
        let mut frequencies: Vec<f64> = vec![];
        let mut effects: Vec<f64> = vec![];
        let mut standard_errors: Vec<f64> = vec![];
        let mut pvalues: Vec<f64> = vec![];
        let mut sample_sizes: Vec<f64> = vec![];
        for (idx, l) in BufReader::new(file).lines().enumerate() {
            let line = l?;
            if line.trim().is_empty() {
                continue;
            }
            // Skip the header line
            if (idx == 0) & line.to_uppercase().starts_with("SNP") {
                continue;
            }
            let vec_line = line.split_whitespace().collect::<Vec<&str>>();
            if vec_line.len() < 8 {
                return Err(Error::new(
                    ErrorKind::Other,
                    "The summary statistics file: ".to_owned()
                        + &self.filename
                        + " expects 8 whitespace-delimited columns (SNP A1 A2 freq b se p N). Line: "
                        + &line
                        + ".",
                ));
            }
            marker_ids.push(vec_line[0].to_owned());
            allele_effect.push(vec_line[1].to_owned());
            allele_other.push(vec_line[2].to_owned());
            for (k, column) in vec![3usize, 4, 5, 6, 7].into_iter().enumerate() {
                let value = vec_line[column].parse::<f64>().map_err(|_| {
                    Error::new(
                        ErrorKind::Other,
                        "Column ".to_owned()
                            + &(column + 1).to_string()
                            + " of the summary statistics file: "
                            + &self.filename
                            + " is not a valid number. Line: "
                            + &line
                            + ".",
                    )
                })?;
                match k {
                    0 => frequencies.push(value),
                    1 => effects.push(value),
                    2 => standard_errors.push(value),
                    3 => pvalues.push(value),
                    _ => sample_sizes.push(value),
                }
            }
        }
        let p = marker_ids.len();
        Ok(Box::new(SummaryStatistics {
            marker_ids: marker_ids,
            chromosome: vec!["".to_owned(); p],
            position: vec![0; p],
            allele_effect: allele_effect,
            allele_other: allele_other,
            frequencies: Array1::from_vec(frequencies),
            effects: Array1::from_vec(effects),
            standard_errors: Array1::from_vec(standard_errors),
            pvalues: Array1::from_vec(pvalues),
            sample_sizes: Array1::from_vec(sample_sizes),
        }))
    }
}

impl SummaryStatistics {
    pub fn p(&self) -> usize {
        self.marker_ids.len()
    }

    pub fn write_ma(&self, filename: &String) -> io::Result<String> {
        let mut writer = BufWriter::new(File::create(filename)?);
        writer.write_all((MA_HEADER.to_owned() + "\n").as_bytes())?;
        for j in 0..self.p() {
            let line = vec![
                self.marker_ids[j].clone(),
                self.allele_effect[j].clone(),
                self.allele_other[j].clone(),
                parse_f64_roundup_and_own(self.frequencies[j], 8),
                self.effects[j].to_string(),
                self.standard_errors[j].to_string(),
                self.pvalues[j].to_string(),
                self.sample_sizes[j].to_string(),
            ]
            .join("\t")
                + "\n";
            writer.write_all(line.as_bytes())?;
        }
        Ok(filename.clone())
    }

    // Reorder the table to the marker order of a genotype set, flipping the
    // effect sign where the counted alleles are swapped, and filling in the
    // chromosome and position columns the .ma format does not carry
    pub fn match_markers(
        &self,
        genotypes: &GenotypesAndPhenotypes,
    ) -> io::Result<SummaryStatistics> {
        let mut index_of: std::collections::HashMap<&String, usize> =
            std::collections::HashMap::new();
        for (j, id) in self.marker_ids.iter().enumerate() {
            index_of.insert(id, j);
        }
        let p = genotypes.p();
        let mut out = SummaryStatistics {
            marker_ids: genotypes.marker_ids.clone(),
            chromosome: genotypes.chromosome.clone(),
            position: genotypes.position.clone(),
            allele_effect: genotypes.allele_effect.clone(),
            allele_other: genotypes.allele_other.clone(),
            frequencies: Array1::from_elem(p, f64::NAN),
            effects: Array1::from_elem(p, f64::NAN),
            standard_errors: Array1::from_elem(p, f64::NAN),
            pvalues: Array1::from_elem(p, f64::NAN),
            sample_sizes: Array1::from_elem(p, f64::NAN),
        };
        for j in 0..p {
            let id = &genotypes.marker_ids[j];
            let k = match index_of.get(id) {
                Some(&k) => k,
                None => {
                    return Err(Error::new(
                        ErrorKind::Other,
                        "Marker ".to_owned()
                            + id
                            + " in the genotype data is absent from the summary statistics table.",
                    ))
                }
            };
            let same = (self.allele_effect[k] == genotypes.allele_effect[j])
                & (self.allele_other[k] == genotypes.allele_other[j]);
            let flipped = (self.allele_effect[k] == genotypes.allele_other[j])
                & (self.allele_other[k] == genotypes.allele_effect[j]);
            if !(same | flipped) {
                return Err(Error::new(
                    ErrorKind::Other,
                    "Alleles of marker ".to_owned()
                        + id
                        + " do not match between the genotype data and the summary statistics table.",
                ));
            }
            let sign = if same { 1.0 } else { -1.0 };
            out.frequencies[j] = if same {
                self.frequencies[k]
            } else {
                1.0 - self.frequencies[k]
            };
            out.effects[j] = sign * self.effects[k];
            out.standard_errors[j] = self.standard_errors[k];
            out.pvalues[j] = self.pvalues[k];
            out.sample_sizes[j] = self.sample_sizes[k];
        }
        Ok(out)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    fn toy_sumstats() -> SummaryStatistics {
        SummaryStatistics {
            marker_ids: vec!["rs1".to_owned(), "rs2".to_owned()],
            chromosome: vec!["1".to_owned(), "1".to_owned()],
            position: vec![100, 200],
            allele_effect: vec!["A".to_owned(), "T".to_owned()],
            allele_other: vec!["G".to_owned(), "C".to_owned()],
            frequencies: Array1::from_vec(vec![0.25, 0.5]),
            effects: Array1::from_vec(vec![0.5, -0.1]),
            standard_errors: Array1::from_vec(vec![0.1, 0.2]),
            pvalues: Array1::from_vec(vec![1e-6, 0.61]),
            sample_sizes: Array1::from_vec(vec![100.0, 100.0]),
        }
    }

    #[test]
    fn test_write_and_parse_ma() {
        let sumstats = toy_sumstats();
        let directory = tempfile::tempdir().unwrap();
        let filename = directory
            .path()
            .join("toy.ma")
            .to_str()
            .unwrap()
            .to_owned();
        sumstats.write_ma(&filename).unwrap();
        let reloaded = *FileSumstats { filename: filename }.lparse().unwrap();
        assert_eq!(sumstats.marker_ids, reloaded.marker_ids);
        assert_eq!(sumstats.effects, reloaded.effects);
        assert_eq!(sumstats.pvalues, reloaded.pvalues);
    }

    #[test]
    fn test_match_markers_flips_swapped_alleles() {
        let sumstats = toy_sumstats();
        let genotypes = GenotypesAndPhenotypes {
            chromosome: vec!["1".to_owned(), "1".to_owned()],
            position: vec![200, 100],
            marker_ids: vec!["rs2".to_owned(), "rs1".to_owned()],
            // rs1 has its counted allele swapped relative to the table
            allele_effect: vec!["T".to_owned(), "G".to_owned()],
            allele_other: vec!["C".to_owned(), "A".to_owned()],
            dosages: Array2::from_elem((2, 2), 0.0),
            phenotypes: Array1::from_elem(2, 0.0),
            sample_names: vec!["a".to_owned(), "b".to_owned()],
        };
        let matched = sumstats.match_markers(&genotypes).unwrap();
        assert_eq!(vec!["rs2".to_owned(), "rs1".to_owned()], matched.marker_ids);
        assert_eq!(-0.1, matched.effects[0]);
        assert_eq!(-0.5, matched.effects[1]);
        assert_eq!(0.75, matched.frequencies[1]);
    }
}
