//! Report generation for aggregated contribution statistics
//!
//! # Implementation Model
//!
//! A report is produced from a slice of [`RepoStats`](crate::stats::RepoStats)
//! that is already sorted by repository name. Each repository becomes one
//! [`OutputRecord`], which adds the derived fields: the number of analyzed pull
//! requests and the lead-time percentiles. Both derived fields are left out
//! entirely when a repository has no lead-time samples.
//!
//! The JSON generator writes into any [`core::fmt::Write`], so callers decide
//! whether the report ends up on the terminal, in a file, or in a test buffer.

mod json;
mod output_record;

pub use json::generate as generate_json;
pub use output_record::OutputRecord;
