pub use self::{linear::*, logistic::*, scan::*};

mod linear;
mod logistic;
mod scan;
