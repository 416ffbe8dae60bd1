use crate::base::*;
use ndarray::prelude::*;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, BufWriter, Error, ErrorKind};

// PLINK .bed magic bytes followed by the SNP-major mode flag
const BED_MAGIC: [u8; 3] = [0x6c, 0x1b, 0x01];

fn parse_fam_phenotype(raw: &[f64]) -> Array1<f64> {
    // PLINK codes case/control phenotypes as 1/2 with -9 (or 0) for missing;
    // anything else is taken as an already-numeric quantitative trait
    let observed = raw.iter().filter(|x| !x.is_nan()).collect::<Vec<&f64>>();
    let all_one_or_two = !observed.is_empty() && observed.iter().all(|&&x| (x == 1.0) | (x == 2.0));
    if all_one_or_two {
        Array1::from_vec(
            raw.iter()
                .map(|&x| if x.is_nan() { f64::NAN } else { x - 1.0 })
                .collect::<Vec<f64>>(),
        )
    } else {
        Array1::from_vec(raw.to_owned())
    }
}

impl Parse<GenotypesAndPhenotypes> for FilePlink {
    // Load a .bed/.bim/.fam triple into the dosage matrix and phenotype vector
    fn lparse(&self) -> io::Result<Box<GenotypesAndPhenotypes>> {
        // Sample side: .fam
        let filename_fam = self.prefix.clone() + ".fam";
        let file_fam = match File::open(&filename_fam) {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "The input fam file: ".to_owned() + &filename_fam + " does not exist. Please make sure you are entering the correct fileset prefix and/or the correct path.")),
        };
        let mut sample_names: Vec<String> = vec![];
        let mut raw_phenotypes: Vec<f64> = vec![];
        for l in BufReader::new(file_fam).lines() {
            let line = l?;
            if line.trim().is_empty() {
                continue;
            }
            let vec_line = line.split_whitespace().collect::<Vec<&str>>();
            if vec_line.len() < 6 {
                return Err(Error::new(
                    ErrorKind::Other,
                    "The fam file: ".to_owned()
                        + &filename_fam
                        + " expects 6 whitespace-delimited columns. Line: "
                        + &line
                        + ".",
                ));
            }
            sample_names.push(vec_line[1].to_owned());
            let value = vec_line[5];
            if (value == "-9") | (value == "NA") {
                raw_phenotypes.push(f64::NAN);
            } else {
                raw_phenotypes.push(value.parse::<f64>().map_err(|_| {
                    Error::new(
                        ErrorKind::Other,
                        "The phenotype column (column 6) of the fam file: ".to_owned()
                            + &filename_fam
                            + " is not a valid number. Line: "
                            + &line
                            + ".",
                    )
                })?);
            }
        }
        let n = sample_names.len();
        let phenotypes = parse_fam_phenotype(&raw_phenotypes);
        // Marker side: .bim
        let filename_bim = self.prefix.clone() + ".bim";
        let file_bim = match File::open(&filename_bim) {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "The input bim file: ".to_owned() + &filename_bim + " does not exist. Please make sure you are entering the correct fileset prefix and/or the correct path.")),
        };
        let mut chromosome: Vec<String> = vec![];
        let mut position: Vec<u64> = vec![];
        let mut marker_ids: Vec<String> = vec![];
        let mut allele_effect: Vec<String> = vec![];
        let mut allele_other: Vec<String> = vec![];
        for l in BufReader::new(file_bim).lines() {
            let line = l?;
            if line.trim().is_empty() {
                continue;
            }
            let vec_line = line.split_whitespace().collect::<Vec<&str>>();
            if vec_line.len() < 6 {
                return Err(Error::new(
                    ErrorKind::Other,
                    "The bim file: ".to_owned()
                        + &filename_bim
                        + " expects 6 whitespace-delimited columns. Line: "
                        + &line
                        + ".",
                ));
            }
            chromosome.push(vec_line[0].to_owned());
            marker_ids.push(vec_line[1].to_owned());
            position.push(vec_line[3].parse::<u64>().map_err(|_| {
                Error::new(
                    ErrorKind::Other,
                    "The position column (column 4) of the bim file: ".to_owned()
                        + &filename_bim
                        + " is not a valid integer. Line: "
                        + &line
                        + ".",
                )
            })?);
            allele_effect.push(vec_line[4].to_owned());
            allele_other.push(vec_line[5].to_owned());
        }
        let p = marker_ids.len();
        // Genotype side: .bed, SNP-major with 2 bits per genotype
        let filename_bed = self.prefix.clone() + ".bed";
        let mut file_bed = match File::open(&filename_bed) {
            Ok(x) => x,
            Err(_) => return Err(Error::new(ErrorKind::Other, "The input bed file: ".to_owned() + &filename_bed + " does not exist. Please make sure you are entering the correct fileset prefix and/or the correct path.")),
        };
        let mut bytes: Vec<u8> = vec![];
        file_bed.read_to_end(&mut bytes)?;
        if (bytes.len() < 3) || (bytes[0..3] != BED_MAGIC) {
            return Err(Error::new(
                ErrorKind::Other,
                "The bed file: ".to_owned()
                    + &filename_bed
                    + " is not a SNP-major PLINK binary genotype file (bad magic bytes).",
            ));
        }
        let bytes_per_marker = (n + 3) / 4;
        if bytes.len() != 3 + (p * bytes_per_marker) {
            return Err(Error::new(
                ErrorKind::Other,
                "The bed file: ".to_owned()
                    + &filename_bed
                    + " is truncated or does not match the fam/bim dimensions (expected "
                    + &(3 + p * bytes_per_marker).to_string()
                    + " bytes, found "
                    + &bytes.len().to_string()
                    + ").",
            ));
        }
        let mut dosages: Array2<f64> = Array2::from_elem((n, p), f64::NAN);
        for j in 0..p {
            for i in 0..n {
                let byte = bytes[3 + (j * bytes_per_marker) + (i / 4)];
                let code = (byte >> ((i % 4) * 2)) & 0b11;
                dosages[(i, j)] = match code {
                    0b00 => 2.0, // homozygous for the counted (A1) allele
                    0b10 => 1.0,
                    0b11 => 0.0,
                    _ => f64::NAN, // 0b01, missing genotype
                };
            }
        }
        let out = GenotypesAndPhenotypes {
            chromosome: chromosome,
            position: position,
            marker_ids: marker_ids,
            allele_effect: allele_effect,
            allele_other: allele_other,
            dosages: dosages,
            phenotypes: phenotypes,
            sample_names: sample_names,
        };
        out.check()?;
        Ok(Box::new(out))
    }
}

impl GenotypesAndPhenotypes {
    // Write the dataset back out as a PLINK .bed/.bim/.fam triple
    pub fn write_plink(&self, prefix: &String) -> io::Result<String> {
        self.check()?;
        let (n, p) = self.dosages.dim();
        // .fam, recoding a 0/1 phenotype back into PLINK's 1/2 convention
        let observed = self
            .phenotypes
            .iter()
            .filter(|x| !x.is_nan())
            .collect::<Vec<&f64>>();
        let binary = !observed.is_empty() && observed.iter().all(|&&x| (x == 0.0) | (x == 1.0));
        let filename_fam = prefix.clone() + ".fam";
        let mut writer_fam = BufWriter::new(File::create(&filename_fam)?);
        for i in 0..n {
            let y = self.phenotypes[i];
            let value = if y.is_nan() {
                "-9".to_owned()
            } else if binary {
                ((y as u64) + 1).to_string()
            } else {
                y.to_string()
            };
            writer_fam.write_all(
                (self.sample_names[i].clone()
                    + " "
                    + &self.sample_names[i]
                    + " 0 0 0 "
                    + &value
                    + "\n")
                    .as_bytes(),
            )?;
        }
        // .bim
        let filename_bim = prefix.clone() + ".bim";
        let mut writer_bim = BufWriter::new(File::create(&filename_bim)?);
        for j in 0..p {
            writer_bim.write_all(
                (self.chromosome[j].clone()
                    + "\t"
                    + &self.marker_ids[j]
                    + "\t0\t"
                    + &self.position[j].to_string()
                    + "\t"
                    + &self.allele_effect[j]
                    + "\t"
                    + &self.allele_other[j]
                    + "\n")
                    .as_bytes(),
            )?;
        }
        // .bed
        let filename_bed = prefix.clone() + ".bed";
        let mut writer_bed = BufWriter::new(File::create(&filename_bed)?);
        writer_bed.write_all(&BED_MAGIC)?;
        let bytes_per_marker = (n + 3) / 4;
        for j in 0..p {
            let mut buffer: Vec<u8> = vec![0u8; bytes_per_marker];
            for i in 0..n {
                let dosage = self.dosages[(i, j)];
                let code: u8 = if dosage.is_nan() {
                    0b01
                } else {
                    match dosage.round() as u64 {
                        2 => 0b00,
                        1 => 0b10,
                        0 => 0b11,
                        _ => {
                            return Err(Error::new(
                                ErrorKind::Other,
                                "Dosages need to be 0, 1, 2 or missing to be written as a bed file. Marker: ".to_owned()
                                    + &self.marker_ids[j]
                                    + ".",
                            ))
                        }
                    }
                };
                buffer[i / 4] |= code << ((i % 4) * 2);
            }
            writer_bed.write_all(&buffer)?;
        }
        Ok(prefix.clone())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plink_write_and_parse() {
        // Inputs
        let dosages: Array2<f64> = Array2::from_shape_vec(
            (5, 3),
            vec![
                0.0, 2.0, 1.0, //
                1.0, 2.0, 0.0, //
                2.0, 1.0, f64::NAN, //
                1.0, 2.0, 0.0, //
                0.0, 2.0, 2.0,
            ],
        )
        .unwrap();
        let genotypes = GenotypesAndPhenotypes {
            chromosome: vec!["1".to_owned(), "1".to_owned(), "2".to_owned()],
            position: vec![1_000, 2_000, 500],
            marker_ids: vec!["rs1".to_owned(), "rs2".to_owned(), "rs3".to_owned()],
            allele_effect: vec!["A".to_owned(), "T".to_owned(), "C".to_owned()],
            allele_other: vec!["G".to_owned(), "C".to_owned(), "G".to_owned()],
            dosages: dosages,
            phenotypes: Array1::from_vec(vec![0.0, 1.0, 1.0, f64::NAN, 0.0]),
            sample_names: vec!["a", "b", "c", "d", "e"]
                .into_iter()
                .map(|x| x.to_owned())
                .collect::<Vec<String>>(),
        };
        let directory = tempfile::tempdir().unwrap();
        let prefix = directory
            .path()
            .join("toy")
            .to_str()
            .unwrap()
            .to_owned();
        // Outputs
        genotypes.write_plink(&prefix).unwrap();
        let reloaded = *FilePlink { prefix: prefix }.lparse().unwrap();
        // Assertions
        assert_eq!(genotypes.marker_ids, reloaded.marker_ids);
        assert_eq!(genotypes.sample_names, reloaded.sample_names);
        assert_eq!(genotypes.chromosome, reloaded.chromosome);
        for i in 0..5 {
            for j in 0..3 {
                let a = genotypes.dosages[(i, j)];
                let b = reloaded.dosages[(i, j)];
                assert!((a.is_nan() && b.is_nan()) || (a == b));
            }
        }
        // The 0/1 phenotype survives the 1/2 fam recoding, missing stays missing
        assert_eq!(0.0, reloaded.phenotypes[0]);
        assert_eq!(1.0, reloaded.phenotypes[1]);
        assert!(reloaded.phenotypes[3].is_nan());
    }

    #[test]
    fn test_bad_magic() {
        let directory = tempfile::tempdir().unwrap();
        let prefix = directory.path().join("bad").to_str().unwrap().to_owned();
        std::fs::write(prefix.clone() + ".bed", vec![0u8, 1u8, 2u8, 3u8]).unwrap();
        std::fs::write(prefix.clone() + ".fam", "a a 0 0 0 1\n").unwrap();
        std::fs::write(prefix.clone() + ".bim", "1 rs1 0 100 A G\n").unwrap();
        assert!(FilePlink { prefix: prefix }.lparse().is_err());
    }

    #[test]
    fn test_truncated_bed_shorter_than_magic() {
        // A payload shorter than the magic bytes is an error, not a panic
        let directory = tempfile::tempdir().unwrap();
        let prefix = directory.path().join("short").to_str().unwrap().to_owned();
        std::fs::write(prefix.clone() + ".bed", vec![0x6cu8, 0x1bu8]).unwrap();
        std::fs::write(prefix.clone() + ".fam", "a a 0 0 0 1\n").unwrap();
        std::fs::write(prefix.clone() + ".bim", "1 rs1 0 100 A G\n").unwrap();
        assert!(FilePlink { prefix: prefix }.lparse().is_err());
    }
}
