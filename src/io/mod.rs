pub use self::{plink::*, sumstats::*};

mod plink;
mod sumstats;
