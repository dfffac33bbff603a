//! Data layer of the shooting-incident pipeline.
//!
//! Loads the published CSV, normalises its schema, parses and filters the
//! incident records, aggregates counts, exports the results and drives the
//! full pipeline end to end.

pub mod aggregator;
pub mod export;
pub mod filter;
pub mod loader;
pub mod normalizer;
pub mod parser;
pub mod pipeline;

pub use incident_core as core;
