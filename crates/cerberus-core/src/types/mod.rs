mod analysis;
mod common;
mod job;
mod record;

pub use analysis::*;
pub use common::*;
pub use job::*;
pub use record::*;
