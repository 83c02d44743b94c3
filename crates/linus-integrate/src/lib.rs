//! Integration engine: turns a classified segment into a grid mutation.
//!
//! A segment either becomes a new entry, merges into an existing one or waits
//! for review. Cell summaries stay bounded throughout.

pub mod integrator;
pub mod similarity;
pub mod summary;

pub use integrator::Integrator;
pub use similarity::SimilarityEngine;
pub use summary::SummaryBuilder;
