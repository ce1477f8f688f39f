//! Field-level and row-level cleaning.
//!
//! - [`FieldNormalizer`]: type coercion and text canonicalization
//! - [`RecordValidator`]: per-row range checks, clamps and drops
//! - [`deduplicate`]: full-row duplicate removal

mod dedup;
mod normalizer;
mod validator;

pub use dedup::{deduplicate, unique_rows};
pub use normalizer::FieldNormalizer;
pub use validator::RecordValidator;
