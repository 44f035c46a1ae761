//! model-ngin
//!
//! Scene-file model loading and material texture binding for wgpu renderers.
//! A [`Model`](data_structures::model::Model) is read from an OBJ or glTF file,
//! its meshes are uploaded as vertex/index buffers, and every material texture
//! is uploaded once per model. At draw time each mesh binds its textures to the
//! `material.texture_<kind><n>` slots of the shader, and slots the mesh has no
//! texture for get a solid fallback colour.
//!
//! High-level modules
//! - `camera`: camera, projection and the camera uniform
//! - `config`: options controlling how scene files are imported
//! - `context`: device, queue and the per-device fallback textures
//! - `data_structures`: meshes, models, textures, instances and the binding plan
//! - `error`: the loading error type
//! - `pipelines`: material bind group layout and the bundled model pipeline
//! - `resources`: scene importers, the texture cache and texture decoding
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod resources;

pub use config::LoadOptions;
pub use error::LoadError;
