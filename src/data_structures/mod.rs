//! Engine data structures: meshes, models, textures and instances.
//!
//! - `material` holds texture kinds and the pure slot binding plan
//! - `default_textures` holds the solid fallback textures
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `vertex` defines the mesh vertex layout
//! - `mesh` and `model` own the GPU buffers and draw calls
//! - `instance` holds per-instance transformation data

pub mod default_textures;
pub mod instance;
pub mod material;
pub mod mesh;
pub mod model;
pub mod texture;
pub mod vertex;
