use clap::Parser;
use log::info;
mod base;
mod evaluation;
mod gwas;
mod io;
mod ld;
mod scoring;
mod simulation;
use base::Parse;
use evaluation::compare_models;
use gwas::gwas_scan;
use ld::ld_matrix;
use scoring::{
    all_snps, clump_and_threshold, clump_indices, clumping, compute_pgs, ldpred_gibbs, ldpred_inf,
    p_thresholding, write_scores,
};

// Instatiate arguments struct
#[derive(Parser, Debug)]
#[clap(author="polyscore developers",
       version="0.1.0",
       about="Polygenic score construction walkthrough.",
       long_about="Polygenic score construction walkthrough: simulate a heritable phenotype on real or simulated genotypes, run a genome-wide association scan, derive candidate marker weights (all markers, p-value thresholding, clumping, clumping+thresholding, and infinitesimal or spike-and-slab Bayesian shrinkage), then compare their predictive accuracy on held-out samples.")]
struct Args {
    /// Analysis to perform (i.e. "simulate", "gwas", "clump", "score", "compare")
    analysis: String,
    /// Prefix of the input PLINK binary fileset (i.e. <bfile>.bed, <bfile>.bim, <bfile>.fam)
    #[clap(short, long, default_value = "")]
    bfile: String,
    /// Output filename or fileset prefix
    #[clap(short, long, default_value = "")]
    output: String,
    /// Filename of the input .ma-style summary statistics table (SNP A1 A2 freq b se p N)
    #[clap(short, long, default_value = "")]
    sumstats: String,
    /// Weighting model for the "score" analysis (i.e. "all_snps", "p_thresholding", "clumping", "clump_and_threshold", "ldpred_inf", "ldpred_gibbs")
    #[clap(short, long, default_value = "clump_and_threshold")]
    model: String,
    /// Number of samples to simulate
    #[clap(long, default_value_t = 1_000)]
    n: usize,
    /// Number of markers to simulate
    #[clap(long, default_value_t = 10_000)]
    n_markers: usize,
    /// Number of chromosomes to simulate
    #[clap(long, default_value_t = 10)]
    n_chr: usize,
    /// Total genome length in bases to simulate
    #[clap(long, default_value_t = 2_200_000_000)]
    max_bp: usize,
    /// Distance in bases at which the simulated r² halves
    #[clap(long, default_value_t = 500_000)]
    r2_half_bp: usize,
    /// Narrow-sense heritability of the simulated trait and of the shrinkage prior
    #[clap(long, default_value_t = 0.5)]
    heritability: f64,
    /// Number of causal markers to simulate
    #[clap(long, default_value_t = 100)]
    n_causal: usize,
    /// Prevalence of the simulated binary trait (1.0 keeps the liability as the phenotype)
    #[clap(long, default_value_t = 0.1)]
    prevalence: f64,
    /// Minimum allele frequency for keeping/simulating markers
    #[clap(long, default_value_t = 0.01)]
    min_allele_frequency: f64,
    /// Maximum fraction of missing dosages per marker
    #[clap(long, default_value_t = 0.1)]
    max_missingness: f64,
    /// Linkage disequilibrium window size in kilobases
    #[clap(long, default_value_t = 250)]
    window_kb: u64,
    /// r² threshold above which clumping prunes a marker
    #[clap(long, default_value_t = 0.1)]
    r2_threshold: f64,
    /// p-value threshold grid, e.g. 1e-8,1e-5,1e-3,1e-2
    #[clap(long, use_value_delimiter=true, value_delimiter=',', default_value="1e-8,1e-5,1e-3,1e-2")]
    p_thresholds: Vec<String>,
    /// Proportion-of-causal-markers grid for the Gibbs sampler, e.g. 0.001,0.01,0.1,1.0
    #[clap(long, use_value_delimiter=true, value_delimiter=',', default_value="0.001,0.01,0.1,1.0")]
    p_causal_grid: Vec<String>,
    /// Number of burn-in sweeps of the Gibbs sampler
    #[clap(long, default_value_t = 50)]
    n_burnin: usize,
    /// Number of post-burn-in sweeps of the Gibbs sampler
    #[clap(long, default_value_t = 100)]
    n_iter: usize,
    /// Fraction of samples used to fit the association scan
    #[clap(long, default_value_t = 0.6)]
    train_fraction: f64,
    /// Fraction of samples used to tune the grid models
    #[clap(long, default_value_t = 0.2)]
    tune_fraction: f64,
    /// Number of threads to use for parallel processing
    #[clap(long, default_value_t = 4)]
    n_threads: usize,
    /// Random seed for the simulation, splitting and the Gibbs sampler
    #[clap(long, default_value_t = 42)]
    seed: u64,
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.n_threads)
        .build_global()
        .expect("Failed to configure the rayon thread pool.");
    let mut output: String = String::from("");
    // Shared parameter parsing
    let p_thresholds = args
        .p_thresholds
        .into_iter()
        .map(|x| {
            x.parse::<f64>()
                .expect("Invalid float input for the p-value threshold grid (--p-thresholds).")
        })
        .collect::<Vec<f64>>();
    let p_causal_grid = args
        .p_causal_grid
        .into_iter()
        .map(|x| {
            x.parse::<f64>()
                .expect("Invalid float input for the proportion-of-causal-markers grid (--p-causal-grid).")
        })
        .collect::<Vec<f64>>();
    let filter_stats = base::FilterStats {
        min_allele_frequency: args.min_allele_frequency,
        max_missingness: args.max_missingness,
    };
    let gibbs = base::GibbsParams {
        p_causal_grid: p_causal_grid.clone(),
        heritability: args.heritability,
        n_burnin: args.n_burnin,
        n_iter: args.n_iter,
        seed: args.seed,
    };
    let window_bp = args.window_kb * 1_000;
    if args.analysis == String::from("simulate") {
        let prefix = if args.output.is_empty() {
            "simulated".to_owned()
        } else {
            args.output.clone()
        };
        let mut genotypes = simulation::simulate_genotypes(
            args.n,
            args.n_markers,
            args.n_chr,
            args.max_bp,
            args.r2_half_bp,
            args.min_allele_frequency.max(0.01),
            args.seed,
        )
        .unwrap();
        let params = base::SimulationParams {
            heritability: args.heritability,
            n_causal: args.n_causal,
            prevalence: args.prevalence,
            seed: args.seed,
        };
        let simulated = simulation::simulate_phenotypes(&mut genotypes, &params).unwrap();
        output = genotypes.write_plink(&prefix).unwrap();
        let causal_table = prefix.clone() + ".causal.tsv";
        simulated
            .write_causal_table(&genotypes, &causal_table)
            .unwrap();
        info!("Simulated fileset written to {}.{{bed,bim,fam}}", prefix);
    } else if args.analysis == String::from("gwas") {
        let file_plink = base::FilePlink {
            prefix: args.bfile.clone(),
        };
        let mut genotypes = *file_plink.lparse().unwrap();
        genotypes.filter(&filter_stats).unwrap();
        genotypes.mean_impute().unwrap();
        let sumstats = gwas_scan(&genotypes).unwrap();
        let filename = if args.output.is_empty() {
            args.bfile.clone() + ".ma"
        } else {
            args.output.clone()
        };
        output = sumstats.write_ma(&filename).unwrap();
    } else if args.analysis == String::from("clump") {
        let file_plink = base::FilePlink {
            prefix: args.bfile.clone(),
        };
        let mut genotypes = *file_plink.lparse().unwrap();
        genotypes.filter(&filter_stats).unwrap();
        genotypes.mean_impute().unwrap();
        let file_sumstats = base::FileSumstats {
            filename: args.sumstats.clone(),
        };
        let sumstats = file_sumstats
            .lparse()
            .unwrap()
            .match_markers(&genotypes)
            .unwrap();
        let ld = ld_matrix(&genotypes, window_bp).unwrap();
        let kept = clump_indices(&sumstats, &ld, args.r2_threshold).unwrap();
        let filename = if args.output.is_empty() {
            args.bfile.clone() + ".clumped.tsv"
        } else {
            args.output.clone()
        };
        let mut writer =
            std::io::BufWriter::new(std::fs::File::create(&filename).unwrap());
        std::io::Write::write_all(&mut writer, "id\tchr\tpos\tp\n".as_bytes()).unwrap();
        for j in kept {
            std::io::Write::write_all(
                &mut writer,
                (sumstats.marker_ids[j].clone()
                    + "\t"
                    + &sumstats.chromosome[j]
                    + "\t"
                    + &sumstats.position[j].to_string()
                    + "\t"
                    + &sumstats.pvalues[j].to_string()
                    + "\n")
                    .as_bytes(),
            )
            .unwrap();
        }
        output = filename;
    } else if args.analysis == String::from("score") {
        let file_plink = base::FilePlink {
            prefix: args.bfile.clone(),
        };
        let mut genotypes = *file_plink.lparse().unwrap();
        genotypes.mean_impute().unwrap();
        let file_sumstats = base::FileSumstats {
            filename: args.sumstats.clone(),
        };
        let sumstats = file_sumstats
            .lparse()
            .unwrap()
            .match_markers(&genotypes)
            .unwrap();
        let ld = ld_matrix(&genotypes, window_bp).unwrap();
        let params = base::ScoringParams {
            marker_sds: genotypes.marker_sds().unwrap(),
            p_threshold: p_thresholds[0],
            r2_threshold: args.r2_threshold,
            p_causal: p_causal_grid[0],
            gibbs: gibbs,
        };
        let (weights, model_name) = match &args.model[..] {
            "all_snps" => all_snps(&sumstats, &ld, &params).unwrap(),
            "p_thresholding" => p_thresholding(&sumstats, &ld, &params).unwrap(),
            "clumping" => clumping(&sumstats, &ld, &params).unwrap(),
            "clump_and_threshold" => clump_and_threshold(&sumstats, &ld, &params).unwrap(),
            "ldpred_inf" => ldpred_inf(&sumstats, &ld, &params).unwrap(),
            "ldpred_gibbs" => ldpred_gibbs(&sumstats, &ld, &params).unwrap(),
            _ => panic!("Unknown weighting model (--model). Please use one of: all_snps, p_thresholding, clumping, clump_and_threshold, ldpred_inf, ldpred_gibbs."),
        };
        info!("Scoring with the {} weights", model_name);
        let scores = compute_pgs(&genotypes, &weights).unwrap();
        let filename = if args.output.is_empty() {
            args.bfile.clone() + ".pgs.tsv"
        } else {
            args.output.clone()
        };
        output = write_scores(&genotypes, &scores, &filename).unwrap();
    } else if args.analysis == String::from("compare") {
        let file_plink = base::FilePlink {
            prefix: args.bfile.clone(),
        };
        let mut genotypes = *file_plink.lparse().unwrap();
        genotypes.filter(&filter_stats).unwrap();
        genotypes.mean_impute().unwrap();
        let performance = compare_models(
            &genotypes,
            window_bp,
            args.r2_threshold,
            &p_thresholds,
            &gibbs,
            args.train_fraction,
            args.tune_fraction,
            args.seed,
        )
        .unwrap();
        output = performance.tabulate();
    } else {
        panic!("Unknown analysis. Please use one of: simulate, gwas, clump, score, compare.");
    }
    println!("{}", output);
}
