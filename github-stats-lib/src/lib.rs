#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for github-stats
//!
//! This library consolidates all functionality for the github-stats tool, which
//! aggregates a single user's contributions (commits, pull requests created,
//! pull requests reviewed and review lead time) per repository across a GitHub
//! organization.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface, configuration and orchestration
//! - [`fetch`]: The [`fetch::Fetcher`] contract and its GitHub implementation
//! - [`stats`]: Concurrent aggregation, merging and percentile summaries
//! - [`reports`]: JSON report generation

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod fetch;

pub mod stats;

#[cfg(any(debug_assertions, test))]
pub mod reports;
#[cfg(not(any(debug_assertions, test)))]
mod reports;

pub use crate::commands::{Host, run};
