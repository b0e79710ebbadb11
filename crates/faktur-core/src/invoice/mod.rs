//! Invoice field normalization: from extractor text to the canonical record.

pub mod classifier;
pub mod normalizer;
pub mod response;
pub mod rules;

pub use classifier::classify;
pub use normalizer::{stored_total, FieldNormalizer, NormalizedExtraction};
pub use response::{parse_response, strip_code_fences, ParsedResponse};
