//! Transfer engine
//!
//! Planning a copy operation over a possibly recursive source tree, then
//! executing the resulting jobs as parallel multi-part transfers.

mod copier;
mod planner;

pub use copier::*;
pub use planner::*;
