pub use self::{clump::*, ldpred::*, pgs::*, threshold::*};

mod clump;
mod ldpred;
mod pgs;
mod threshold;
