//! gridstar: star-schema loader for motor-racing season extracts.
//!
//! Flat extract files reference entities only by natural/business keys
//! (driver name + birth date, constructor name, race year + name, circuit
//! name, status text). The pipelines here rewrite fact rows to carry the
//! surrogate keys assigned by the warehouse dimension tables. Whatever
//! fails to resolve is reported, never dropped.

pub mod assemble;
pub mod cleaning;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod extract;
pub mod facts;
pub mod frame;
pub mod keys;
pub mod resolve;
pub mod sink;
