//! Configuration documents
//!
//! Everything between a document on disk and a list of constructed steps:
//! parameter-spec decoding, range expressions, distribution sampling,
//! variant selection and the serialization engine that ties them together.

pub mod distribution;
pub mod document;
pub mod engine;
pub mod range;
pub mod spec;
pub mod variants;

pub use distribution::DistributionSpec;
pub use document::{ConfigDocument, DocumentFormat};
pub use engine::{base_name, ConfigEngine, LoadOptions};
pub use spec::ParamSpec;
pub use variants::{select_variants, VariantKey};
