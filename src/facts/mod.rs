//! The three fact pipelines: qualifying, pit stops, results.
//!
//! Each pipeline runs the same shape: normalize nulls, attach natural keys
//! from the reference extracts, (where required) drop rows whose business
//! keys are incomplete, resolve each dimension to its surrogate key, then
//! assemble the canonical fact columns. They differ only in which
//! dimensions they touch and which columns survive.

pub mod pit_stops;
pub mod qualifying;
pub mod results;

pub use pit_stops::prepare_pit_stops_data;
pub use qualifying::prepare_qualifying_data;
pub use results::prepare_results_data;
