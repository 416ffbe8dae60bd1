pub use self::{simulate_genotypes::*, simulate_phenotypes::*};

mod simulate_genotypes;
mod simulate_phenotypes;
