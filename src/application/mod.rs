//! Application layer (conversion stages and policies).
//!
//! Each stage takes a model by reference and returns a new one, so stages
//! can be run and tested in isolation.

pub mod converter;
pub mod mapper;
pub mod report;
pub mod resolver;
pub mod risk;
pub mod validation;

pub use converter::{ConversionOptions, ConversionResult, Converter};
pub use report::ThreatReport;
