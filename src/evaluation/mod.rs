use crate::base::*;
use crate::gwas::*;
use crate::ld::*;
use crate::scoring::*;
use log::info;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, Error, ErrorKind};

/// Area under the ROC curve via the Mann-Whitney rank statistic
pub fn area_under_roc(phenotypes: &Array1<f64>, scores: &Array1<f64>) -> io::Result<f64> {
    let n = phenotypes.len();
    if n != scores.len() {
        return Err(Error::new(
            ErrorKind::Other,
            "The phenotype and score vectors are not the same size.",
        ));
    }
    let n_cases = phenotypes.iter().filter(|&&y| y == 1.0).count();
    let n_controls = phenotypes.iter().filter(|&&y| y == 0.0).count();
    if (n_cases == 0) | (n_controls == 0) {
        return Err(Error::new(
            ErrorKind::Other,
            "AUC needs at least one case and one control.",
        ));
    }
    let ranks = average_ranks(scores)?;
    let rank_sum_cases = (0..n)
        .filter(|&i| phenotypes[i] == 1.0)
        .fold(0.0, |sum, i| sum + ranks[i]);
    let u = rank_sum_cases - (n_cases as f64 * (n_cases as f64 + 1.0) / 2.0);
    Ok(u / (n_cases as f64 * n_controls as f64))
}

impl ScoreEvaluation for GenotypesAndPhenotypes {
    // Deterministic shuffle into training, tuning and testing sample sets
    fn shuffle_split(
        &self,
        train_fraction: f64,
        tune_fraction: f64,
        seed: u64,
    ) -> io::Result<(Vec<usize>, Vec<usize>, Vec<usize>)> {
        let n = self.n();
        if (train_fraction <= 0.0) | (tune_fraction <= 0.0) | (train_fraction + tune_fraction >= 1.0)
        {
            return Err(Error::new(
                ErrorKind::Other,
                "The training and tuning fractions need to be positive and sum to less than 1.0 to leave a test set.",
            ));
        }
        let n_train = (n as f64 * train_fraction).floor() as usize;
        let n_tune = (n as f64 * tune_fraction).floor() as usize;
        if (n_train < 2) | (n_tune < 2) | (n - n_train - n_tune < 2) {
            return Err(Error::new(
                ErrorKind::Other,
                "Each of the training, tuning and test sets needs at least 2 samples. Please use more samples or adjust the fractions.",
            ));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let shuffled = rand::seq::index::sample(&mut rng, n, n)
            .into_iter()
            .collect::<Vec<usize>>();
        let mut train = shuffled[0..n_train].to_vec();
        let mut tune = shuffled[n_train..(n_train + n_tune)].to_vec();
        let mut test = shuffled[(n_train + n_tune)..n].to_vec();
        train.sort();
        tune.sort();
        test.sort();
        Ok((train, tune, test))
    }

    fn subset_samples(&self, indices: &[usize]) -> io::Result<GenotypesAndPhenotypes> {
        self.check()?;
        let n = self.n();
        if indices.iter().any(|&i| i >= n) {
            return Err(Error::new(
                ErrorKind::Other,
                "Sample index out of bounds while subsetting.",
            ));
        }
        Ok(GenotypesAndPhenotypes {
            chromosome: self.chromosome.clone(),
            position: self.position.clone(),
            marker_ids: self.marker_ids.clone(),
            allele_effect: self.allele_effect.clone(),
            allele_other: self.allele_other.clone(),
            dosages: self.dosages.select(Axis(0), indices),
            phenotypes: self.phenotypes.select(Axis(0), indices),
            sample_names: indices.iter().map(|&i| self.sample_names[i].clone()).collect(),
        })
    }

    // AUC (binary phenotypes only), Pearson correlation and R² of a score
    fn performance(&self, scores: &Array1<f64>) -> io::Result<(f64, f64, f64)> {
        let binary = self
            .phenotypes
            .iter()
            .all(|&y| (y == 0.0) | (y == 1.0));
        let auc = if binary {
            area_under_roc(&self.phenotypes, scores)?
        } else {
            f64::NAN
        };
        let (cor, _pval) = pearsons_correlation(&self.phenotypes.view(), &scores.view())?;
        Ok((auc, cor, cor.powf(2.0)))
    }
}

type WeightingModel =
    fn(&SummaryStatistics, &LdMatrix, &ScoringParams) -> io::Result<(Array1<f64>, String)>;

fn tuning_metric(tune: &GenotypesAndPhenotypes, scores: &Array1<f64>) -> io::Result<f64> {
    let (auc, cor, _r2) = tune.performance(scores)?;
    if auc.is_nan() {
        Ok(cor)
    } else {
        Ok(auc)
    }
}

/// The full comparison: association scan and LD on the training split,
/// grid models tuned on the tuning split, every model judged on the held-out
/// test split.
pub fn compare_models(
    genotypes: &GenotypesAndPhenotypes,
    window_bp: u64,
    r2_threshold: f64,
    p_threshold_grid: &Vec<f64>,
    gibbs: &GibbsParams,
    train_fraction: f64,
    tune_fraction: f64,
    seed: u64,
) -> io::Result<PredictionPerformance> {
    genotypes.check()?;
    if p_threshold_grid.is_empty() | gibbs.p_causal_grid.is_empty() {
        return Err(Error::new(
            ErrorKind::Other,
            "The p-value threshold and p_causal grids both need at least one value.",
        ));
    }
    // Samples without an observed phenotype cannot be fitted or judged
    let observed = (0..genotypes.n())
        .filter(|&i| !genotypes.phenotypes[i].is_nan())
        .collect::<Vec<usize>>();
    let genotypes = if observed.len() < genotypes.n() {
        info!(
            "Dropping {} samples with missing phenotypes",
            genotypes.n() - observed.len()
        );
        genotypes.subset_samples(&observed)?
    } else {
        genotypes.clone()
    };
    let (train_idx, tune_idx, test_idx) = genotypes.shuffle_split(train_fraction, tune_fraction, seed)?;
    info!(
        "Split {} samples into {} training, {} tuning and {} testing",
        genotypes.n(),
        train_idx.len(),
        tune_idx.len(),
        test_idx.len()
    );
    let train = genotypes.subset_samples(&train_idx)?;
    let tune = genotypes.subset_samples(&tune_idx)?;
    let test = genotypes.subset_samples(&test_idx)?;
    let sumstats = gwas_scan(&train)?;
    let ld = ld_matrix(&train, window_bp)?;
    let mut params = ScoringParams {
        marker_sds: train.marker_sds()?,
        p_threshold: p_threshold_grid[0],
        r2_threshold: r2_threshold,
        p_causal: gibbs.p_causal_grid[0],
        gibbs: gibbs.clone(),
    };
    let mut models: Vec<String> = vec![];
    let mut auc: Vec<f64> = vec![];
    let mut cor: Vec<f64> = vec![];
    let mut r2: Vec<f64> = vec![];
    let mut n_nonzero: Vec<usize> = vec![];
    let mut tuned_param: Vec<String> = vec![];
    // Fixed models first, then the grid-tuned ones
    let fixed_models: Vec<WeightingModel> = vec![all_snps, clumping, ldpred_inf];
    for function in fixed_models {
        let (weights, name) = function(&sumstats, &ld, &params)?;
        let scores = compute_pgs(&test, &weights)?;
        let (model_auc, model_cor, model_r2) = test.performance(&scores)?;
        models.push(name);
        auc.push(model_auc);
        cor.push(model_cor);
        r2.push(model_r2);
        n_nonzero.push(weights.iter().filter(|&&w| w != 0.0).count());
        tuned_param.push("-".to_owned());
    }
    let thresholded_models: Vec<WeightingModel> = vec![p_thresholding, clump_and_threshold];
    for function in thresholded_models {
        let mut best: Option<(f64, f64, Array1<f64>, String)> = None;
        for &p_threshold in p_threshold_grid.iter() {
            params.p_threshold = p_threshold;
            let (weights, name) = function(&sumstats, &ld, &params)?;
            let tune_scores = compute_pgs(&tune, &weights)?;
            let metric = tuning_metric(&tune, &tune_scores)?;
            // NaN metrics (e.g. a constant score) never win over a finite one
            let better = match best {
                Some((best_metric, _, _, _)) => (metric > best_metric) | best_metric.is_nan(),
                None => true,
            };
            if better {
                best = Some((metric, p_threshold, weights, name));
            }
        }
        let (_metric, p_threshold, weights, name) = best.unwrap();
        info!("{}: tuned p-value threshold = {}", name, p_threshold);
        let scores = compute_pgs(&test, &weights)?;
        let (model_auc, model_cor, model_r2) = test.performance(&scores)?;
        models.push(name);
        auc.push(model_auc);
        cor.push(model_cor);
        r2.push(model_r2);
        n_nonzero.push(weights.iter().filter(|&&w| w != 0.0).count());
        tuned_param.push("p<".to_owned() + &p_threshold.to_string());
    }
    {
        let mut best: Option<(f64, f64, Array1<f64>, String)> = None;
        for &p_causal in gibbs.p_causal_grid.iter() {
            params.p_causal = p_causal;
            let (weights, name) = ldpred_gibbs(&sumstats, &ld, &params)?;
            let tune_scores = compute_pgs(&tune, &weights)?;
            let metric = tuning_metric(&tune, &tune_scores)?;
            let better = match best {
                Some((best_metric, _, _, _)) => (metric > best_metric) | best_metric.is_nan(),
                None => true,
            };
            if better {
                best = Some((metric, p_causal, weights, name));
            }
        }
        let (_metric, p_causal, weights, name) = best.unwrap();
        info!("{}: tuned p_causal = {}", name, p_causal);
        let scores = compute_pgs(&test, &weights)?;
        let (model_auc, model_cor, model_r2) = test.performance(&scores)?;
        models.push(name);
        auc.push(model_auc);
        cor.push(model_cor);
        r2.push(model_r2);
        n_nonzero.push(weights.iter().filter(|&&w| w != 0.0).count());
        tuned_param.push("p_causal=".to_owned() + &p_causal.to_string());
    }
    Ok(PredictionPerformance {
        models: models,
        auc: auc,
        cor: cor,
        r2: r2,
        n_nonzero: n_nonzero,
        tuned_param: tuned_param,
    })
}

impl PredictionPerformance {
    // Aligned comparison table for stdout
    pub fn tabulate(&self) -> String {
        let mut out = format!(
            "{:<20} {:>8} {:>8} {:>8} {:>10} {:>16}\n",
            "model", "auc", "cor", "r2", "n_nonzero", "tuned"
        );
        for i in 0..self.models.len() {
            out += &format!(
                "{:<20} {:>8} {:>8} {:>8} {:>10} {:>16}\n",
                self.models[i],
                parse_f64_roundup_and_own(self.auc[i], 6),
                parse_f64_roundup_and_own(self.cor[i], 6),
                parse_f64_roundup_and_own(self.r2[i], 6),
                self.n_nonzero[i],
                self.tuned_param[i]
            );
        }
        out
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{simulate_genotypes, simulate_phenotypes};

    #[test]
    fn test_area_under_roc() {
        let phenotypes = Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        // Perfectly separating score
        let scores = Array1::from_vec(vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(1.0, area_under_roc(&phenotypes, &scores).unwrap());
        // Perfectly wrong score
        let reversed = Array1::from_vec(vec![2.0, 1.0, 0.0, -1.0]);
        assert_eq!(0.0, area_under_roc(&phenotypes, &reversed).unwrap());
        // A constant score ties everything: AUC = 0.5
        let constant = Array1::from_elem(4, 0.123);
        assert_eq!(0.5, area_under_roc(&phenotypes, &constant).unwrap());
    }

    #[test]
    fn test_shuffle_split() {
        let genotypes = simulate_genotypes(100, 10, 1, 1_000_000, 100_000, 0.2, 3).unwrap();
        let (train, tune, test) = genotypes.shuffle_split(0.6, 0.2, 99).unwrap();
        assert_eq!(60, train.len());
        assert_eq!(20, tune.len());
        assert_eq!(20, test.len());
        // Disjoint and exhaustive
        let mut all = train.clone();
        all.extend(tune.iter());
        all.extend(test.iter());
        all.sort();
        assert_eq!((0..100).collect::<Vec<usize>>(), all);
        // Deterministic given the seed
        let (train2, _, _) = genotypes.shuffle_split(0.6, 0.2, 99).unwrap();
        assert_eq!(train, train2);
    }

    #[test]
    fn test_compare_models_end_to_end() {
        let mut genotypes =
            simulate_genotypes(600, 80, 4, 4_000_000, 200_000, 0.1, 101).unwrap();
        let params = SimulationParams {
            heritability: 0.5,
            n_causal: 10,
            prevalence: 0.3,
            seed: 101,
        };
        simulate_phenotypes(&mut genotypes, &params).unwrap();
        let gibbs = GibbsParams {
            p_causal_grid: vec![0.01, 0.1, 1.0],
            heritability: 0.5,
            n_burnin: 20,
            n_iter: 50,
            seed: 101,
        };
        let performance = compare_models(
            &genotypes,
            500_000,
            0.2,
            &vec![1e-8, 1e-5, 1e-3, 1e-2],
            &gibbs,
            0.6,
            0.2,
            101,
        )
        .unwrap();
        // Every model appears exactly once
        let expected_models = vec![
            "all_snps".to_owned(),
            "clumping".to_owned(),
            "ldpred_inf".to_owned(),
            "p_thresholding".to_owned(),
            "clump_and_threshold".to_owned(),
            "ldpred_gibbs".to_owned(),
        ];
        assert_eq!(expected_models, performance.models);
        // AUCs are probabilities and at least one model beats a coin flip
        assert!(performance.auc.iter().all(|&a| (a >= 0.0) & (a <= 1.0)));
        assert!(performance.auc.iter().any(|&a| a > 0.55));
        // The table lists every model
        let table = performance.tabulate();
        for model in expected_models.iter() {
            assert!(table.contains(&model[..]));
        }
    }
}
