use ndarray::prelude::*;
use std::io;

///////////////////////////////////////////////////////////////////////////////
// STRUCTS
///////////////////////////////////////////////////////////////////////////////

/// Handle to a PLINK binary fileset, i.e. <prefix>.bed, <prefix>.bim and <prefix>.fam
#[derive(Debug, Clone)]
pub struct FilePlink {
    pub prefix: String,
}

/// Handle to an .ma-style summary statistics table (SNP A1 A2 freq b se p N)
#[derive(Debug, Clone)]
pub struct FileSumstats {
    pub filename: String,
}

/// Marker quality control thresholds applied after loading the dosage matrix
#[derive(Debug, Clone)]
pub struct FilterStats {
    pub min_allele_frequency: f64,
    pub max_missingness: f64,
}

// Struct of marker dosages and phenotypes for association and scoring
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypesAndPhenotypes {
    pub chromosome: Vec<String>,    // p markers
    pub position: Vec<u64>,         // p
    pub marker_ids: Vec<String>,    // p
    pub allele_effect: Vec<String>, // p, the counted (A1) allele
    pub allele_other: Vec<String>,  // p, the alternative (A2) allele
    pub dosages: Array2<f64>,       // n samples x p markers, counts of A1 in {0, 1, 2} or NaN
    pub phenotypes: Array1<f64>,    // n, binary coded 0/1 or quantitative
    pub sample_names: Vec<String>,  // n
}

// Struct of per-marker association results
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStatistics {
    pub marker_ids: Vec<String>,
    pub chromosome: Vec<String>,
    pub position: Vec<u64>,
    pub allele_effect: Vec<String>,
    pub allele_other: Vec<String>,
    pub frequencies: Array1<f64>, // frequency of the effect allele
    pub effects: Array1<f64>,     // allelic effect per dosage unit
    pub standard_errors: Array1<f64>,
    pub pvalues: Array1<f64>,
    pub sample_sizes: Array1<f64>,
}

/// Banded linkage disequilibrium structure: for each marker j,
/// `correlations[j][k - window_starts[j]]` holds the Pearson correlation
/// between markers k and j for all k in `window_starts[j]..=j` on the same
/// chromosome. The band is symmetric and the diagonal entries are 1.
#[derive(Debug, Clone)]
pub struct LdMatrix {
    pub window_starts: Vec<usize>,
    pub correlations: Vec<Array1<f64>>,
}

#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub heritability: f64,
    pub n_causal: usize,
    pub prevalence: f64, // case fraction on the liability scale; 1.0 keeps the phenotype quantitative
    pub seed: u64,
}

// Struct of the simulated trait architecture for later inspection
#[derive(Debug, Clone)]
pub struct SimulatedPhenotypes {
    pub phenotypes: Array1<f64>,  // n, binary 0/1, or the liability itself if prevalence == 1.0
    pub liabilities: Array1<f64>, // n, genetic plus environmental liability
    pub causal_indices: Vec<usize>, // marker column indices
    pub causal_effects: Array1<f64>, // standardised effects of the causal markers
}

/// Settings of the spike-and-slab Gibbs sampler shared across the p_causal grid
#[derive(Debug, Clone)]
pub struct GibbsParams {
    pub p_causal_grid: Vec<f64>,
    pub heritability: f64,
    pub n_burnin: usize,
    pub n_iter: usize,
    pub seed: u64,
}

// Struct of the per-grid-point inputs consumed by the weighting models
#[derive(Debug, Clone)]
pub struct ScoringParams {
    pub marker_sds: Array1<f64>, // p, dosage standard deviations in the LD reference
    pub p_threshold: f64,
    pub r2_threshold: f64,
    pub p_causal: f64,
    pub gibbs: GibbsParams,
}

// Struct for the per-marker logistic regression of phenotype on dosage
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub b: Array1<f64>,
    pub v_b: Array1<f64>,
    pub z: Array1<f64>,
    pub pval: Array1<f64>,
}

// Struct for the per-marker least squares regression on the liability scale
#[derive(Debug, Clone)]
pub struct LinearRegression {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    pub b: Array1<f64>,
    pub e: Array1<f64>,
    pub ve: f64,
    pub v_b: Array1<f64>,
    pub t: Array1<f64>,
    pub pval: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct PredictionPerformance {
    pub models: Vec<String>,      // m weighting models
    pub auc: Vec<f64>,            // m, area under the ROC curve on the test split
    pub cor: Vec<f64>,            // m, Pearson correlation between score and phenotype
    pub r2: Vec<f64>,             // m, squared correlation
    pub n_nonzero: Vec<usize>,    // m, markers carrying a non-zero weight
    pub tuned_param: Vec<String>, // m, grid point selected on the tuning split, "-" if none
}

///////////////////////////////////////////////////////////////////////////////
// TRAITS
///////////////////////////////////////////////////////////////////////////////

pub trait Parse<T> {
    fn lparse(&self) -> io::Result<Box<T>>;
}

pub trait Regression {
    fn new() -> Self;
    fn estimate_effects(&mut self) -> io::Result<&mut Self>;
    fn estimate_variances(&mut self) -> io::Result<&mut Self>;
    fn estimate_significance(&mut self) -> io::Result<&mut Self>;
}

pub trait ScoreEvaluation {
    fn shuffle_split(
        &self,
        train_fraction: f64,
        tune_fraction: f64,
        seed: u64,
    ) -> io::Result<(Vec<usize>, Vec<usize>, Vec<usize>)>;
    fn subset_samples(&self, indices: &[usize]) -> io::Result<GenotypesAndPhenotypes>;
    fn performance(&self, scores: &Array1<f64>) -> io::Result<(f64, f64, f64)>;
}
