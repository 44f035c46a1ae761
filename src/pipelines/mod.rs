//! Render pipelines.
//!
//! - `material`: the material bind group layout and the bundled model pipeline

pub mod material;
