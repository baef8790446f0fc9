//! Contribution statistics
//!
//! The [`Aggregator`] drives every [`Fetcher`](crate::fetch::Fetcher) operation
//! concurrently, merges the per-source maps into one [`RepoStats`] per repository
//! and returns them sorted by repository name.
//!
//! # Implementation Model
//!
//! All fetches are joined with a first-error-wins combinator: the moment one
//! fetch fails, the others are dropped and the error is returned unchanged. Only
//! when every fetch has succeeded are the results merged. Merging is a map union
//! where a repository missing from a source gets zero for that source's field.
//!
//! [`summarize`] turns lead-time samples into [`LeadTimePercentiles`] and is kept
//! separate from the aggregation so it can be tested as a pure function.

mod aggregator;
mod percentiles;
mod repo_stats;

pub use aggregator::{AggregateRequest, Aggregator};
pub use percentiles::{LeadTimePercentiles, summarize};
pub use repo_stats::RepoStats;
