#![doc = include_str!("../README.md")]

mod envelope;
pub mod error;
pub mod normalizer;
pub mod parser;
pub mod severity;

pub use error::NormalizerError;
pub use normalizer::ResultNormalizer;
pub use parser::{BackendParser, Draft, GenericParser, ParseOutcome};
pub use severity::SeverityTable;
