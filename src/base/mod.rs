pub use self::{genotypes::*, helpers::*, structs_and_traits::*};

mod genotypes;
mod helpers;
mod structs_and_traits;
